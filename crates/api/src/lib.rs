//! HTTP API server for the product catalog.
//!
//! Provides REST endpoints for product management under `/api/products`,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use application::pipeline::{Cache, InMemoryCache};
use application::{CatalogDeps, CatalogService, default_event_bus};
use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use store::PostgresStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use error::StartupError;
use routes::products::AppState;
use routes::system::Storage;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(
    state: Arc<AppState>,
    metrics_handle: PrometheusHandle,
    config: &Config,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    let products = Router::new()
        .route("/", get(routes::products::list).post(routes::products::create))
        .route(
            "/{id}",
            get(routes::products::get)
                .put(routes::products::update)
                .delete(routes::products::delete),
        )
        .route("/sku-exists/{sku}", get(routes::products::sku_exists))
        .route("/{id}/lock-price", post(routes::products::lock_price))
        .route("/{id}/unlock-price", post(routes::products::unlock_price));

    let mut app = Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api/products", products)
        .with_state(state)
        .merge(metrics_router);

    if config.is_development() {
        app = app.layer(axum::middleware::map_response(error::reveal_internal_detail));
    }

    app.layer(cors_layer(config.cors_origin.as_deref()))
        .layer(TraceLayer::new_for_http())
}

/// Allows any origin unless one is configured.
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin {
        None => layer.allow_origin(Any),
        Some(origin) => match HeaderValue::from_str(origin) {
            Ok(value) => layer.allow_origin(value),
            Err(_) => {
                tracing::warn!(
                    origin,
                    "Ignoring invalid CORS_ORIGIN; cross-origin requests are refused"
                );
                layer
            }
        },
    }
}

/// Builds the application state, connecting to PostgreSQL when a database
/// URL is configured and applying pending migrations.
pub async fn create_state(config: &Config) -> Result<Arc<AppState>, StartupError> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::info!(storage = "memory", "Using in-memory product store");
        let deps = CatalogDeps::in_memory();
        return Ok(Arc::new(AppState {
            catalog: CatalogService::new(deps, config.cache_ttl),
            storage: Storage::Memory,
        }));
    };

    let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
    let store = PostgresStore::new(pool.clone())
        .with_slow_query_threshold(config.slow_query_threshold);
    store.run_migrations().await?;
    tracing::info!(storage = "postgres", "Connected to PostgreSQL and applied migrations");

    let store = Arc::new(store);
    let cache: Arc<dyn Cache> = Arc::new(InMemoryCache::new());
    let deps = CatalogDeps {
        reader: store.clone(),
        writer: store.clone(),
        idempotency: store,
        publisher: Arc::new(default_event_bus(cache.clone())),
        cache,
    };

    Ok(Arc::new(AppState {
        catalog: CatalogService::new(deps, config.cache_ttl),
        storage: Storage::Postgres(pool),
    }))
}
