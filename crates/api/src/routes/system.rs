//! Health and metrics endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

use super::products::AppState;

/// Where products are persisted.
#[derive(Clone)]
pub enum Storage {
    Memory,
    Postgres(sqlx::PgPool),
}

impl Storage {
    pub fn name(&self) -> &'static str {
        match self {
            Storage::Memory => "memory",
            Storage::Postgres(_) => "postgres",
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub storage: &'static str,
}

/// GET /health: `200` when storage answers, `503` otherwise.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let storage = state.storage.name();
    let reachable = match &state.storage {
        Storage::Memory => true,
        Storage::Postgres(pool) => match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(error = %err, "Health check could not reach the database");
                false
            }
        },
    };

    if reachable {
        (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                storage,
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unavailable",
                storage,
            }),
        )
    }
}

/// GET /metrics: Prometheus text exposition.
pub async fn metrics(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        handle.render(),
    )
}
