//! Catalog service providing a simplified API for product operations.

use std::sync::Arc;
use std::time::Duration;

use common::ProductId;
use store::{
    IdempotencyStore, InMemoryIdempotencyStore, InMemoryProductStore, ProductReadRepository,
    ProductWriteRepository,
};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::events::{
    CacheInvalidationListener, DomainEventLogger, EventPublisher, InMemoryEventBus,
};
use crate::pipeline::{Cache, InMemoryCache, Outcome, Pipeline, Route};
use crate::products::validators::{
    CreateProductValidator, ListProductsValidator, PricingValidator, ProductIdValidator,
    SkuExistsValidator, UpdateProductValidator,
};
use crate::products::{
    CreateProduct, DeleteProduct, GetProductById, ListProducts, PagedResult, ProductDto,
    ProductHandlers, SetPriceLock, SkuAvailability, SkuExists, UpdateProduct,
};

/// Default lifetime of cached query results.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

/// Collaborators the catalog service is built from.
#[derive(Clone)]
pub struct CatalogDeps {
    pub reader: Arc<dyn ProductReadRepository>,
    pub writer: Arc<dyn ProductWriteRepository>,
    pub idempotency: Arc<dyn IdempotencyStore>,
    pub cache: Arc<dyn Cache>,
    pub publisher: Arc<dyn EventPublisher>,
}

impl CatalogDeps {
    /// In-memory stores, cache and event bus, with cache invalidation wired up.
    pub fn in_memory() -> Self {
        let products = Arc::new(InMemoryProductStore::new());
        let cache: Arc<dyn Cache> = Arc::new(InMemoryCache::new());
        Self {
            reader: products.clone(),
            writer: products,
            idempotency: Arc::new(InMemoryIdempotencyStore::new()),
            publisher: Arc::new(default_event_bus(cache.clone())),
            cache,
        }
    }
}

/// Event bus with the standard listeners registered.
pub fn default_event_bus(cache: Arc<dyn Cache>) -> InMemoryEventBus {
    let mut bus = InMemoryEventBus::new();
    bus.register(Arc::new(DomainEventLogger));
    bus.register(Arc::new(CacheInvalidationListener::new(cache)));
    bus
}

/// Service for managing the product catalog.
///
/// Every operation goes through the request pipeline with the routes
/// registered here.
pub struct CatalogService {
    pipeline: Pipeline,
    create: Route<CreateProduct>,
    update: Route<UpdateProduct>,
    set_price_lock: Route<SetPriceLock>,
    delete: Route<DeleteProduct>,
    get: Route<GetProductById>,
    list: Route<ListProducts>,
    sku_exists: Route<SkuExists>,
}

impl CatalogService {
    /// Creates a new catalog service.
    pub fn new(deps: CatalogDeps, cache_ttl: Duration) -> Self {
        let handlers = Arc::new(ProductHandlers::new(
            deps.reader,
            deps.writer,
            deps.publisher,
        ));
        let id_rule = Arc::new(ProductIdValidator);

        Self {
            pipeline: Pipeline::new(deps.cache, deps.idempotency, cache_ttl),
            create: Route::<CreateProduct>::new(handlers.clone())
                .validator(Arc::new(CreateProductValidator))
                .validator(Arc::new(PricingValidator)),
            update: Route::<UpdateProduct>::new(handlers.clone())
                .validator(Arc::new(UpdateProductValidator))
                .validator(Arc::new(PricingValidator)),
            set_price_lock: Route::<SetPriceLock>::new(handlers.clone())
                .validator(id_rule.clone()),
            delete: Route::<DeleteProduct>::new(handlers.clone()).validator(id_rule.clone()),
            get: Route::<GetProductById>::new(handlers.clone()).validator(id_rule),
            list: Route::<ListProducts>::new(handlers.clone())
                .validator(Arc::new(ListProductsValidator)),
            sku_exists: Route::<SkuExists>::new(handlers)
                .validator(Arc::new(SkuExistsValidator)),
        }
    }

    /// Creates a service backed entirely by in-memory collaborators.
    pub fn in_memory() -> Self {
        Self::new(CatalogDeps::in_memory(), DEFAULT_CACHE_TTL)
    }

    /// Returns the underlying pipeline.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Creates a new product.
    #[tracing::instrument(skip(self, cancel), fields(sku = %cmd.sku))]
    pub async fn create_product(
        &self,
        cmd: CreateProduct,
        cancel: &CancellationToken,
    ) -> Result<Outcome<ProductId>> {
        self.pipeline.send(&self.create, &cmd, cancel).await
    }

    /// Updates name, prices and stock of a product.
    #[tracing::instrument(skip(self, cmd, cancel), fields(product_id = %cmd.id))]
    pub async fn update_product(
        &self,
        cmd: UpdateProduct,
        cancel: &CancellationToken,
    ) -> Result<Outcome<()>> {
        self.pipeline.send(&self.update, &cmd, cancel).await
    }

    /// Locks or unlocks the price of a product.
    #[tracing::instrument(skip(self, cmd, cancel), fields(product_id = %cmd.id))]
    pub async fn set_price_lock(
        &self,
        cmd: SetPriceLock,
        cancel: &CancellationToken,
    ) -> Result<Outcome<()>> {
        self.pipeline.send(&self.set_price_lock, &cmd, cancel).await
    }

    /// Deletes a product.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn delete_product(
        &self,
        cmd: DeleteProduct,
        cancel: &CancellationToken,
    ) -> Result<Outcome<()>> {
        self.pipeline.send(&self.delete, &cmd, cancel).await
    }

    /// Loads one product.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn get_product(
        &self,
        query: GetProductById,
        cancel: &CancellationToken,
    ) -> Result<Outcome<Option<ProductDto>>> {
        self.pipeline.send(&self.get, &query, cancel).await
    }

    /// Lists one page of products.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn list_products(
        &self,
        query: ListProducts,
        cancel: &CancellationToken,
    ) -> Result<Outcome<PagedResult<ProductDto>>> {
        self.pipeline.send(&self.list, &query, cancel).await
    }

    /// Checks whether a SKU is taken.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn sku_exists(
        &self,
        query: SkuExists,
        cancel: &CancellationToken,
    ) -> Result<Outcome<SkuAvailability>> {
        self.pipeline.send(&self.sku_exists, &query, cancel).await
    }
}
