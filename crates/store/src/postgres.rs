use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::ProductId;
use domain::{Money, Product, ProductState, Sku};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgRow};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::repository::{Change, ChangeSet, cancellable};
use crate::{
    IdempotencyStore, Page, PageRequest, ProductReadRepository, ProductUnitOfWork,
    ProductWriteRepository, Result, SortDirection, SortField,
};

/// Queries slower than this are logged at warn level unless configured otherwise.
pub const DEFAULT_SLOW_QUERY_THRESHOLD: Duration = Duration::from_millis(200);

const PRODUCT_COLUMNS: &str = "id, name, sku, sale_price, cost, stock, price_locked";

/// PostgreSQL-backed product store and idempotency store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    slow_query_threshold: Duration,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            slow_query_threshold: DEFAULT_SLOW_QUERY_THRESHOLD,
        }
    }

    /// Sets the duration above which a query is reported as slow.
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = threshold;
        self
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Runs a query with cancellation and slow-query reporting.
    async fn timed<T, F>(&self, operation: &'static str, cancel: &CancellationToken, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let start = Instant::now();
        let result = cancellable(cancel, fut).await;
        let elapsed = start.elapsed();

        metrics::histogram!("catalog_store_query_duration_seconds", "operation" => operation)
            .record(elapsed.as_secs_f64());

        if elapsed >= self.slow_query_threshold {
            tracing::warn!(
                operation,
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                "Slow query"
            );
        }

        result
    }

    fn order_by(page: &PageRequest) -> &'static str {
        match (page.sort_field, page.sort_direction) {
            (SortField::Name, SortDirection::Asc) => "name ASC, id ASC",
            (SortField::Name, SortDirection::Desc) => "name DESC, id ASC",
            (SortField::Price, SortDirection::Asc) => "sale_price ASC, id ASC",
            (SortField::Price, SortDirection::Desc) => "sale_price DESC, id ASC",
            (SortField::Sku, SortDirection::Asc) => "sku ASC, id ASC",
            (SortField::Sku, SortDirection::Desc) => "sku DESC, id ASC",
            (SortField::Stock, SortDirection::Asc) => "stock ASC, id ASC",
            (SortField::Stock, SortDirection::Desc) => "stock DESC, id ASC",
        }
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        let id = ProductId::from_uuid(row.try_get::<Uuid, _>("id")?);
        let sku: String = row.try_get("sku")?;

        let state = ProductState {
            name: row.try_get("name")?,
            sku: Sku::parse(&sku)?,
            sale_price: Money::new(row.try_get::<Decimal, _>("sale_price")?)?,
            cost: Money::new(row.try_get::<Decimal, _>("cost")?)?,
            stock: row.try_get("stock")?,
            price_locked: row.try_get("price_locked")?,
        };

        Ok(Product::restore(id, state)?)
    }
}

#[async_trait]
impl ProductReadRepository for PostgresStore {
    async fn get_by_id(
        &self,
        id: ProductId,
        cancel: &CancellationToken,
    ) -> Result<Option<Product>> {
        self.timed("get_by_id", cancel, async {
            let row = sqlx::query(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
            ))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

            row.map(Self::row_to_product).transpose()
        })
        .await
    }

    async fn get_paged(
        &self,
        page: PageRequest,
        cancel: &CancellationToken,
    ) -> Result<Page<Product>> {
        self.timed("get_paged", cancel, async {
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
                .fetch_one(&self.pool)
                .await?;

            let rows = sqlx::query(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY {} LIMIT $1 OFFSET $2",
                Self::order_by(&page)
            ))
            .bind(i64::from(page.page_size))
            .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

            let items = rows
                .into_iter()
                .map(Self::row_to_product)
                .collect::<Result<Vec<_>>>()?;

            Ok(Page {
                items,
                total: u64::try_from(total).unwrap_or_default(),
            })
        })
        .await
    }

    async fn exists_by_sku(
        &self,
        normalized_sku: &str,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        self.timed("exists_by_sku", cancel, async {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE sku = $1)")
                    .bind(normalized_sku)
                    .fetch_one(&self.pool)
                    .await?;
            Ok(exists)
        })
        .await
    }
}

impl ProductWriteRepository for PostgresStore {
    fn begin(&self) -> Box<dyn ProductUnitOfWork> {
        Box::new(PostgresUnitOfWork {
            store: self.clone(),
            changes: ChangeSet::default(),
        })
    }
}

/// Unit of work that applies its changes in one transaction.
pub struct PostgresUnitOfWork {
    store: PostgresStore,
    changes: ChangeSet,
}

impl PostgresUnitOfWork {
    async fn apply(&self) -> Result<usize> {
        let mut tx = self.store.pool.begin().await?;

        for change in self.changes.as_slice() {
            match change {
                Change::Insert(id, state) => {
                    sqlx::query(
                        r#"
                        INSERT INTO products (id, name, sku, sale_price, cost, stock, price_locked)
                        VALUES ($1, $2, $3, $4, $5, $6, $7)
                        "#,
                    )
                    .bind(id.as_uuid())
                    .bind(&state.name)
                    .bind(state.sku.as_str())
                    .bind(state.sale_price.amount())
                    .bind(state.cost.amount())
                    .bind(state.stock)
                    .bind(state.price_locked)
                    .execute(&mut *tx)
                    .await?;
                }
                Change::Update(id, state) => {
                    let result = sqlx::query(
                        r#"
                        UPDATE products
                        SET name = $2, sku = $3, sale_price = $4, cost = $5, stock = $6,
                            price_locked = $7, updated_at = NOW()
                        WHERE id = $1
                        "#,
                    )
                    .bind(id.as_uuid())
                    .bind(&state.name)
                    .bind(state.sku.as_str())
                    .bind(state.sale_price.amount())
                    .bind(state.cost.amount())
                    .bind(state.stock)
                    .bind(state.price_locked)
                    .execute(&mut *tx)
                    .await?;

                    if result.rows_affected() == 0 {
                        return Err(crate::StoreError::NotFound(*id));
                    }
                }
                Change::Delete(id) => {
                    let result = sqlx::query("DELETE FROM products WHERE id = $1")
                        .bind(id.as_uuid())
                        .execute(&mut *tx)
                        .await?;

                    if result.rows_affected() == 0 {
                        return Err(crate::StoreError::NotFound(*id));
                    }
                }
            }
        }

        tx.commit().await?;
        Ok(self.changes.as_slice().len())
    }
}

#[async_trait]
impl ProductUnitOfWork for PostgresUnitOfWork {
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
        // Dropping the transaction on cancellation rolls it back.
        let applied = self
            .store
            .timed("save_changes", cancel, self.apply())
            .await?;
        self.changes.clear();
        Ok(applied)
    }
}

#[async_trait]
impl IdempotencyStore for PostgresStore {
    async fn has_processed(&self, key: &str, cancel: &CancellationToken) -> Result<bool> {
        self.timed("has_processed", cancel, async {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM processed_requests WHERE key = $1)")
                    .bind(key)
                    .fetch_one(&self.pool)
                    .await?;
            Ok(exists)
        })
        .await
    }

    async fn mark_processed(&self, key: &str, cancel: &CancellationToken) -> Result<()> {
        self.timed("mark_processed", cancel, async {
            sqlx::query("INSERT INTO processed_requests (key) VALUES ($1) ON CONFLICT DO NOTHING")
                .bind(key)
                .execute(&self.pool)
                .await?;
            Ok(())
        })
        .await
    }
}
