//! Command and query handlers for products.
//!
//! Command handlers follow one sequence: check preconditions that need
//! storage, run the aggregate operation, stage and save the change, then
//! publish the drained domain events and cache invalidations. Nothing is
//! published unless the save succeeded.

use std::sync::Arc;

use async_trait::async_trait;
use common::ProductId;
use domain::{AggregateRoot, DomainError, Money, Product, Sku};
use store::{
    PageRequest, ProductReadRepository, ProductUnitOfWork, ProductWriteRepository, SortDirection,
    SortField,
};
use tokio_util::sync::CancellationToken;

use super::cache_keys;
use super::commands::{CreateProduct, DeleteProduct, SetPriceLock, UpdateProduct};
use super::dto::{PagedResult, ProductDto, SkuAvailability};
use super::queries::{GetProductById, ListProducts, SkuExists};
use crate::error::{AppError, Result};
use crate::events::{EventPublisher, Notification};
use crate::pipeline::Handler;

/// Handlers for every product request, sharing one set of collaborators.
#[derive(Clone)]
pub struct ProductHandlers {
    reader: Arc<dyn ProductReadRepository>,
    writer: Arc<dyn ProductWriteRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl ProductHandlers {
    pub fn new(
        reader: Arc<dyn ProductReadRepository>,
        writer: Arc<dyn ProductWriteRepository>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            reader,
            writer,
            publisher,
        }
    }

    async fn load(&self, id: ProductId, cancel: &CancellationToken) -> Result<Product> {
        self.reader
            .get_by_id(id, cancel)
            .await?
            .ok_or_else(|| AppError::product_not_found(id))
    }

    /// Saves `product` as an update and announces its events.
    async fn commit_update(&self, mut product: Product, cancel: &CancellationToken) -> Result<()> {
        let mut uow = self.writer.begin();
        uow.update(&product);
        uow.save_changes(cancel).await?;

        self.publish_events(&mut product).await;
        self.publisher
            .publish(Notification::invalidate(cache_keys::product(product.id())))
            .await;
        self.publisher
            .publish(Notification::invalidate(cache_keys::LIST_PREFIX))
            .await;
        Ok(())
    }

    async fn publish_events(&self, product: &mut Product) {
        for event in product.take_events() {
            self.publisher.publish(Notification::Domain(event)).await;
        }
    }
}

#[async_trait]
impl Handler<CreateProduct> for ProductHandlers {
    async fn handle(&self, cmd: &CreateProduct, cancel: &CancellationToken) -> Result<ProductId> {
        let sku = Sku::parse(&cmd.sku)?;
        if self.reader.exists_by_sku(sku.as_str(), cancel).await? {
            return Err(DomainError::DuplicateSku {
                sku: sku.as_str().to_string(),
            }
            .into());
        }

        let mut product = Product::new(
            ProductId::new(),
            &cmd.name,
            sku,
            Money::new(cmd.sale_price)?,
            Money::new(cmd.cost)?,
            cmd.stock,
        )?;

        let mut uow = self.writer.begin();
        uow.add(&product);
        uow.save_changes(cancel).await?;

        self.publish_events(&mut product).await;
        self.publisher
            .publish(Notification::invalidate(cache_keys::LIST_PREFIX))
            .await;

        tracing::info!(product_id = %product.id(), sku = %product.sku(), "Product created");
        Ok(product.id())
    }
}

#[async_trait]
impl Handler<UpdateProduct> for ProductHandlers {
    async fn handle(&self, cmd: &UpdateProduct, cancel: &CancellationToken) -> Result<()> {
        let mut product = self.load(cmd.id, cancel).await?;

        product.update_name(&cmd.name)?;
        product.update_price(Money::new(cmd.sale_price)?, Money::new(cmd.cost)?)?;
        let delta = cmd
            .stock
            .checked_sub(product.stock())
            .ok_or(DomainError::StockOverflow {
                stock: product.stock(),
                delta: cmd.stock,
            })?;
        product.adjust_stock(delta)?;

        self.commit_update(product, cancel).await
    }
}

#[async_trait]
impl Handler<SetPriceLock> for ProductHandlers {
    async fn handle(&self, cmd: &SetPriceLock, cancel: &CancellationToken) -> Result<()> {
        let mut product = self.load(cmd.id, cancel).await?;

        if cmd.locked {
            product.lock_price()?;
        } else {
            product.unlock_price()?;
        }

        self.commit_update(product, cancel).await
    }
}

#[async_trait]
impl Handler<DeleteProduct> for ProductHandlers {
    async fn handle(&self, cmd: &DeleteProduct, cancel: &CancellationToken) -> Result<()> {
        let product = self.load(cmd.id, cancel).await?;

        let mut uow = self.writer.begin();
        uow.delete(&product);
        uow.save_changes(cancel).await?;

        self.publisher
            .publish(Notification::invalidate(cache_keys::product(product.id())))
            .await;
        self.publisher
            .publish(Notification::invalidate(cache_keys::LIST_PREFIX))
            .await;

        tracing::info!(product_id = %product.id(), "Product deleted");
        Ok(())
    }
}

#[async_trait]
impl Handler<GetProductById> for ProductHandlers {
    async fn handle(
        &self,
        query: &GetProductById,
        cancel: &CancellationToken,
    ) -> Result<Option<ProductDto>> {
        let product = self.reader.get_by_id(query.id, cancel).await?;
        Ok(product.as_ref().map(ProductDto::from))
    }
}

#[async_trait]
impl Handler<ListProducts> for ProductHandlers {
    async fn handle(
        &self,
        query: &ListProducts,
        cancel: &CancellationToken,
    ) -> Result<PagedResult<ProductDto>> {
        let sort_field = match &query.sort_field {
            Some(field) => field.parse::<SortField>(),
            None => Ok(SortField::default()),
        };
        let sort_direction = match &query.sort_direction {
            Some(direction) => direction.parse::<SortDirection>(),
            None => Ok(SortDirection::default()),
        };
        // Unknown values were rejected by validation; fall back to the defaults.
        let page = PageRequest::new(query.page_number, query.page_size).sorted_by(
            sort_field.unwrap_or_default(),
            sort_direction.unwrap_or_default(),
        );

        let result = self.reader.get_paged(page, cancel).await?;

        Ok(PagedResult {
            items: result.items.iter().map(ProductDto::from).collect(),
            total: result.total,
            page_number: query.page_number,
            page_size: query.page_size,
        })
    }
}

#[async_trait]
impl Handler<SkuExists> for ProductHandlers {
    async fn handle(&self, query: &SkuExists, cancel: &CancellationToken) -> Result<SkuAvailability> {
        let sku = Sku::normalize(&query.sku);
        let exists = self.reader.exists_by_sku(&sku, cancel).await?;
        Ok(SkuAvailability { sku, exists })
    }
}
