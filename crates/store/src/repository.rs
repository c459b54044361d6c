use async_trait::async_trait;
use common::ProductId;
use domain::{Product, ProductState};
use tokio_util::sync::CancellationToken;

use crate::{Page, PageRequest, Result, StoreError};

/// Read side of product persistence.
///
/// All implementations must be thread-safe (Send + Sync) and must return
/// `StoreError::Cancelled` promptly once `cancel` fires.
#[async_trait]
pub trait ProductReadRepository: Send + Sync {
    /// Loads a product by id.
    async fn get_by_id(&self, id: ProductId, cancel: &CancellationToken)
    -> Result<Option<Product>>;

    /// Returns one page of products in the requested order plus the total count.
    async fn get_paged(&self, page: PageRequest, cancel: &CancellationToken)
    -> Result<Page<Product>>;

    /// Checks whether a normalized SKU is already taken.
    async fn exists_by_sku(&self, normalized_sku: &str, cancel: &CancellationToken)
    -> Result<bool>;
}

/// Write side of product persistence.
///
/// Writes go through a [`ProductUnitOfWork`] so that several changes can be
/// made durable together.
pub trait ProductWriteRepository: Send + Sync {
    /// Starts an empty unit of work.
    fn begin(&self) -> Box<dyn ProductUnitOfWork>;
}

/// Staged product changes. Nothing is durable until [`save_changes`] succeeds.
///
/// [`save_changes`]: ProductUnitOfWork::save_changes
#[async_trait]
pub trait ProductUnitOfWork: Send {
    fn add(&mut self, product: &Product);

    fn update(&mut self, product: &Product);

    fn delete(&mut self, product: &Product);

    /// Applies every staged change atomically and returns how many were applied.
    ///
    /// On failure no staged change is applied and the staged list is kept.
    async fn save_changes(&mut self, cancel: &CancellationToken) -> Result<usize>;
}

/// Durable record of command keys that already completed.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn has_processed(&self, key: &str, cancel: &CancellationToken) -> Result<bool>;

    /// Records the key. Marking an already-marked key is not an error.
    async fn mark_processed(&self, key: &str, cancel: &CancellationToken) -> Result<()>;
}

/// One staged write.
#[derive(Debug, Clone)]
pub(crate) enum Change {
    Insert(ProductId, ProductState),
    Update(ProductId, ProductState),
    Delete(ProductId),
}

/// Ordered list of staged writes shared by the store implementations.
#[derive(Debug, Default)]
pub(crate) struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub(crate) fn insert(&mut self, product: &Product) {
        self.changes
            .push(Change::Insert(product.id(), product.state().clone()));
    }

    pub(crate) fn update(&mut self, product: &Product) {
        self.changes
            .push(Change::Update(product.id(), product.state().clone()));
    }

    pub(crate) fn delete(&mut self, product: &Product) {
        self.changes.push(Change::Delete(product.id()));
    }

    pub(crate) fn as_slice(&self) -> &[Change] {
        &self.changes
    }

    pub(crate) fn clear(&mut self) {
        self.changes.clear();
    }
}

/// Runs `fut` unless `cancel` fires first.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(StoreError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StoreError::Cancelled),
        result = fut => result,
    }
}
