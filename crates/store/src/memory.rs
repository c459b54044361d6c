use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use common::ProductId;
use domain::{Product, ProductState};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::repository::{Change, ChangeSet, cancellable};
use crate::{
    IdempotencyStore, Page, PageRequest, ProductReadRepository, ProductUnitOfWork,
    ProductWriteRepository, Result, SortDirection, SortField, StoreError,
};

/// Name reported when the in-memory SKU index rejects a write.
pub const SKU_UNIQUE_INDEX: &str = "ux_products_sku";

/// In-memory product store.
///
/// Provides the same interface as the PostgreSQL implementation, including a
/// unique index on the normalized SKU. Clones share the same data.
#[derive(Clone, Default)]
pub struct InMemoryProductStore {
    products: Arc<RwLock<HashMap<ProductId, ProductState>>>,
}

impl InMemoryProductStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored products.
    pub async fn product_count(&self) -> usize {
        self.products.read().await.len()
    }

    /// Removes every product.
    pub async fn clear(&self) {
        self.products.write().await.clear();
    }

    fn apply(
        products: &mut HashMap<ProductId, ProductState>,
        change: &Change,
    ) -> Result<()> {
        match change {
            Change::Insert(id, state) => {
                if products.contains_key(id) {
                    return Err(StoreError::Conflict {
                        constraint: "products_pkey".to_string(),
                    });
                }
                Self::check_sku_free(products, *id, state)?;
                products.insert(*id, state.clone());
            }
            Change::Update(id, state) => {
                if !products.contains_key(id) {
                    return Err(StoreError::NotFound(*id));
                }
                Self::check_sku_free(products, *id, state)?;
                products.insert(*id, state.clone());
            }
            Change::Delete(id) => {
                if products.remove(id).is_none() {
                    return Err(StoreError::NotFound(*id));
                }
            }
        }
        Ok(())
    }

    fn check_sku_free(
        products: &HashMap<ProductId, ProductState>,
        id: ProductId,
        state: &ProductState,
    ) -> Result<()> {
        let taken = products
            .iter()
            .any(|(other_id, other)| *other_id != id && other.sku == state.sku);
        if taken {
            return Err(StoreError::Conflict {
                constraint: SKU_UNIQUE_INDEX.to_string(),
            });
        }
        Ok(())
    }

    fn compare(
        page: &PageRequest,
        (a_id, a): (&ProductId, &ProductState),
        (b_id, b): (&ProductId, &ProductState),
    ) -> Ordering {
        let by_field = match page.sort_field {
            SortField::Name => a.name.cmp(&b.name),
            SortField::Price => a.sale_price.cmp(&b.sale_price),
            SortField::Sku => a.sku.cmp(&b.sku),
            SortField::Stock => a.stock.cmp(&b.stock),
        };
        let by_field = match page.sort_direction {
            SortDirection::Asc => by_field,
            SortDirection::Desc => by_field.reverse(),
        };
        by_field.then_with(|| a_id.cmp(b_id))
    }
}

#[async_trait]
impl ProductReadRepository for InMemoryProductStore {
    async fn get_by_id(
        &self,
        id: ProductId,
        cancel: &CancellationToken,
    ) -> Result<Option<Product>> {
        cancellable(cancel, async {
            let products = self.products.read().await;
            products
                .get(&id)
                .map(|state| Product::restore(id, state.clone()))
                .transpose()
                .map_err(StoreError::from)
        })
        .await
    }

    async fn get_paged(
        &self,
        page: PageRequest,
        cancel: &CancellationToken,
    ) -> Result<Page<Product>> {
        cancellable(cancel, async {
            let products = self.products.read().await;
            let mut rows: Vec<_> = products.iter().collect();
            rows.sort_by(|a, b| Self::compare(&page, *a, *b));

            let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
            let items = rows
                .into_iter()
                .skip(skip)
                .take(page.page_size as usize)
                .map(|(id, state)| Product::restore(*id, state.clone()))
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(Page {
                items,
                total: products.len() as u64,
            })
        })
        .await
    }

    async fn exists_by_sku(
        &self,
        normalized_sku: &str,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        cancellable(cancel, async {
            let products = self.products.read().await;
            Ok(products
                .values()
                .any(|state| state.sku.as_str() == normalized_sku))
        })
        .await
    }
}

impl ProductWriteRepository for InMemoryProductStore {
    fn begin(&self) -> Box<dyn ProductUnitOfWork> {
        Box::new(InMemoryUnitOfWork {
            store: self.clone(),
            changes: ChangeSet::default(),
        })
    }
}

/// Unit of work over an [`InMemoryProductStore`].
pub struct InMemoryUnitOfWork {
    store: InMemoryProductStore,
    changes: ChangeSet,
}

#[async_trait]
impl ProductUnitOfWork for InMemoryUnitOfWork {
    fn add(&mut self, product: &Product) {
        self.changes.insert(product);
    }

    fn update(&mut self, product: &Product) {
        self.changes.update(product);
    }

    fn delete(&mut self, product: &Product) {
        self.changes.delete(product);
    }

    async fn save_changes(&mut self, cancel: &CancellationToken) -> Result<usize> {
        let applied = cancellable(cancel, async {
            let mut products = self.store.products.write().await;

            // Apply to a copy so a failing change leaves the store untouched.
            let mut next = products.clone();
            for change in self.changes.as_slice() {
                InMemoryProductStore::apply(&mut next, change)?;
            }
            *products = next;
            Ok(self.changes.as_slice().len())
        })
        .await?;

        self.changes.clear();
        Ok(applied)
    }
}

/// In-memory idempotency store.
#[derive(Clone, Default)]
pub struct InMemoryIdempotencyStore {
    keys: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of recorded keys.
    pub async fn key_count(&self) -> usize {
        self.keys.read().await.len()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn has_processed(&self, key: &str, cancel: &CancellationToken) -> Result<bool> {
        cancellable(cancel, async { Ok(self.keys.read().await.contains(key)) }).await
    }

    async fn mark_processed(&self, key: &str, cancel: &CancellationToken) -> Result<()> {
        cancellable(cancel, async {
            self.keys.write().await.insert(key.to_string());
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use domain::{Money, Sku};
    use rust_decimal::Decimal;

    use super::*;

    fn product(name: &str, sku: &str, sale_cents: i64, stock: i32) -> Product {
        let sale = Money::new(Decimal::new(sale_cents, 2)).unwrap();
        Product::new(
            ProductId::new(),
            name,
            Sku::parse(sku).unwrap(),
            sale,
            Money::zero(),
            stock,
        )
        .unwrap()
    }

    async fn seed(store: &InMemoryProductStore, products: &[Product]) {
        let cancel = CancellationToken::new();
        let mut uow = store.begin();
        for p in products {
            uow.add(p);
        }
        uow.save_changes(&cancel).await.unwrap();
    }

    #[tokio::test]
    async fn test_nothing_is_visible_before_save() {
        let store = InMemoryProductStore::new();
        let cancel = CancellationToken::new();
        let p = product("Widget", "WID-001", 1000, 1);

        let mut uow = store.begin();
        uow.add(&p);
        assert!(store.get_by_id(p.id(), &cancel).await.unwrap().is_none());

        assert_eq!(uow.save_changes(&cancel).await.unwrap(), 1);
        let loaded = store.get_by_id(p.id(), &cancel).await.unwrap().unwrap();
        assert_eq!(loaded.state(), p.state());
    }

    #[tokio::test]
    async fn test_duplicate_sku_is_a_conflict_and_nothing_is_applied() {
        let store = InMemoryProductStore::new();
        let cancel = CancellationToken::new();
        seed(&store, &[product("A", "PRD-001", 100, 1)]).await;

        let fresh = product("Fresh", "NEW-001", 100, 1);
        let clash = product("B", "prd 001", 100, 1);
        let mut uow = store.begin();
        uow.add(&fresh);
        uow.add(&clash);

        let err = uow.save_changes(&cancel).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.product_count().await, 1);
        assert!(!store.exists_by_sku("NEW001", &cancel).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_and_delete_of_missing_product_fail() {
        let store = InMemoryProductStore::new();
        let cancel = CancellationToken::new();
        let ghost = product("Ghost", "GHO-001", 100, 1);

        let mut uow = store.begin();
        uow.update(&ghost);
        assert!(matches!(
            uow.save_changes(&cancel).await,
            Err(StoreError::NotFound(id)) if id == ghost.id()
        ));

        let mut uow = store.begin();
        uow.delete(&ghost);
        assert!(uow.save_changes(&cancel).await.is_err());
    }

    #[tokio::test]
    async fn test_paging_and_sorting() {
        let store = InMemoryProductStore::new();
        let cancel = CancellationToken::new();
        seed(
            &store,
            &[
                product("Charlie", "CCC-001", 300, 5),
                product("Alpha", "AAA-001", 200, 9),
                product("Bravo", "BBB-001", 100, 1),
            ],
        )
        .await;

        let page = store
            .get_paged(PageRequest::new(1, 2), &cancel)
            .await
            .unwrap();
        let names: Vec<_> = page.items.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["Alpha", "Bravo"]);
        assert_eq!(page.total, 3);

        let page = store
            .get_paged(
                PageRequest::new(1, 10).sorted_by(SortField::Price, SortDirection::Desc),
                &cancel,
            )
            .await
            .unwrap();
        let names: Vec<_> = page.items.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["Charlie", "Alpha", "Bravo"]);

        let past_end = store
            .get_paged(PageRequest::new(5, 10), &cancel)
            .await
            .unwrap();
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 3);
    }

    #[tokio::test]
    async fn test_cancelled_save_applies_nothing() {
        let store = InMemoryProductStore::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut uow = store.begin();
        uow.add(&product("Widget", "WID-001", 100, 1));

        assert!(matches!(
            uow.save_changes(&cancel).await,
            Err(StoreError::Cancelled)
        ));
        assert_eq!(store.product_count().await, 0);
    }

    #[tokio::test]
    async fn test_idempotency_keys() {
        let keys = InMemoryIdempotencyStore::new();
        let cancel = CancellationToken::new();

        assert!(!keys.has_processed("CreateProduct:1", &cancel).await.unwrap());
        keys.mark_processed("CreateProduct:1", &cancel).await.unwrap();
        keys.mark_processed("CreateProduct:1", &cancel).await.unwrap();

        assert!(keys.has_processed("CreateProduct:1", &cancel).await.unwrap());
        assert_eq!(keys.key_count().await, 1);
    }
}
