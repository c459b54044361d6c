//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use common::ProductId;
use domain::{Money, Product, Sku};
use rust_decimal_macros::dec;
use sqlx::PgPool;
use store::{
    IdempotencyStore, PageRequest, PostgresStore, ProductReadRepository, ProductUnitOfWork,
    ProductWriteRepository, SortDirection, SortField, StoreError,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!("../../../migrations/001_create_products.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE products, processed_requests")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn product(name: &str, sku: &str, sale: rust_decimal::Decimal, stock: i32) -> Product {
    Product::new(
        ProductId::new(),
        name,
        Sku::parse(sku).unwrap(),
        Money::new(sale).unwrap(),
        Money::new(dec!(1.00)).unwrap(),
        stock,
    )
    .unwrap()
}

#[tokio::test]
async fn add_and_load_product() {
    let store = get_test_store().await;
    let cancel = CancellationToken::new();
    let widget = product("Widget", "wid-001", dec!(19.99), 4);

    let mut uow = store.begin();
    uow.add(&widget);
    assert_eq!(uow.save_changes(&cancel).await.unwrap(), 1);

    let loaded = store
        .get_by_id(widget.id(), &cancel)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.state(), widget.state());
    assert!(store.exists_by_sku("WID001", &cancel).await.unwrap());
    assert!(!store.exists_by_sku("WID002", &cancel).await.unwrap());
}

#[tokio::test]
async fn duplicate_sku_is_classified_as_conflict() {
    let store = get_test_store().await;
    let cancel = CancellationToken::new();

    let mut uow = store.begin();
    uow.add(&product("First", "PRD-001", dec!(5), 1));
    uow.save_changes(&cancel).await.unwrap();

    let mut uow = store.begin();
    uow.add(&product("Second", "prd 001", dec!(5), 1));
    let err = uow.save_changes(&cancel).await.unwrap_err();

    assert!(
        matches!(err, StoreError::Conflict { ref constraint } if constraint == "ux_products_sku"),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn failed_save_rolls_back_the_whole_unit_of_work() {
    let store = get_test_store().await;
    let cancel = CancellationToken::new();
    let kept = product("Kept", "KEP-001", dec!(5), 1);
    let ghost = product("Ghost", "GHO-001", dec!(5), 1);

    let mut uow = store.begin();
    uow.add(&kept);
    uow.update(&ghost);
    assert!(matches!(
        uow.save_changes(&cancel).await,
        Err(StoreError::NotFound(_))
    ));

    assert!(store.get_by_id(kept.id(), &cancel).await.unwrap().is_none());
}

#[tokio::test]
async fn update_and_delete_product() {
    let store = get_test_store().await;
    let cancel = CancellationToken::new();
    let mut widget = product("Widget", "WID-001", dec!(10), 4);

    let mut uow = store.begin();
    uow.add(&widget);
    uow.save_changes(&cancel).await.unwrap();

    widget.update_name("Widget Pro").unwrap();
    widget.lock_price().unwrap();
    let mut uow = store.begin();
    uow.update(&widget);
    uow.save_changes(&cancel).await.unwrap();

    let loaded = store
        .get_by_id(widget.id(), &cancel)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.name(), "Widget Pro");
    assert!(loaded.is_price_locked());

    let mut uow = store.begin();
    uow.delete(&loaded);
    uow.save_changes(&cancel).await.unwrap();
    assert!(store.get_by_id(widget.id(), &cancel).await.unwrap().is_none());
}

#[tokio::test]
async fn paged_listing_sorts_and_counts() {
    let store = get_test_store().await;
    let cancel = CancellationToken::new();

    let mut uow = store.begin();
    uow.add(&product("Charlie", "CCC-001", dec!(3), 1));
    uow.add(&product("Alpha", "AAA-001", dec!(2), 1));
    uow.add(&product("Bravo", "BBB-001", dec!(4), 1));
    uow.save_changes(&cancel).await.unwrap();

    let page = store
        .get_paged(PageRequest::new(1, 2), &cancel)
        .await
        .unwrap();
    let names: Vec<_> = page.items.iter().map(|p| p.name().to_string()).collect();
    assert_eq!(names, vec!["Alpha", "Bravo"]);
    assert_eq!(page.total, 3);

    let page = store
        .get_paged(
            PageRequest::new(2, 2).sorted_by(SortField::Price, SortDirection::Desc),
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].name(), "Alpha");
}

#[tokio::test]
async fn idempotency_keys_are_recorded_once() {
    let store = get_test_store().await;
    let cancel = CancellationToken::new();

    assert!(!store.has_processed("CreateProduct:abc", &cancel).await.unwrap());
    store.mark_processed("CreateProduct:abc", &cancel).await.unwrap();
    store.mark_processed("CreateProduct:abc", &cancel).await.unwrap();
    assert!(store.has_processed("CreateProduct:abc", &cancel).await.unwrap());
}

#[tokio::test]
async fn cancelled_query_returns_cancelled() {
    let store = get_test_store().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = store.get_by_id(ProductId::new(), &cancel).await;
    assert!(matches!(result, Err(StoreError::Cancelled)));
}
