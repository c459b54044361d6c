//! Product CRUD endpoints.
//!
//! Every handler owns a cancellation token whose drop guard fires when axum
//! drops the request future, so a disconnected client cancels its request.

use std::sync::Arc;

use application::products::{
    CreateProduct, DeleteProduct, GetProductById, ListProducts, PagedResult, ProductDto,
    SetPriceLock, SkuAvailability, SkuExists, UpdateProduct,
};
use application::{AppError, CatalogService, DataSource, Outcome};
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use common::{ProductId, RequestId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::system::Storage;
use crate::error::ApiError;

/// Header carrying the client-chosen idempotency key of a command. Takes
/// precedence over a `request_id` in the body.
pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub catalog: CatalogService,
    pub storage: Storage,
}

impl AppState {
    /// State backed entirely by in-memory collaborators.
    pub fn in_memory() -> Self {
        Self {
            catalog: CatalogService::in_memory(),
            storage: Storage::Memory,
        }
    }
}

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct ProductBody {
    pub name: String,
    pub sku: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub sale_price: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub cost: Decimal,
    pub stock: i32,
    #[serde(default)]
    pub request_id: Option<RequestId>,
}

/// Update bodies carry no SKU; it is fixed at creation.
#[derive(Debug, Deserialize)]
pub struct UpdateProductBody {
    pub name: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub sale_price: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub cost: Decimal,
    pub stock: i32,
    #[serde(default)]
    pub request_id: Option<RequestId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_field: Option<String>,
    pub sort_direction: Option<String>,
}

// -- Response types --

/// Query result annotated with provenance.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: T,
    pub source: DataSource,
    pub elapsed_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: ProductId,
}

#[derive(Debug, Serialize)]
pub struct ReplayResponse {
    pub status: &'static str,
    pub request_id: Option<RequestId>,
}

// -- Helpers --

fn parse_id(raw: &str) -> Result<ProductId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid product id: {raw}")))
}

fn request_id(headers: &HeaderMap) -> Result<Option<RequestId>, ApiError> {
    let Some(value) = headers.get(IDEMPOTENCY_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| uuid::Uuid::parse_str(v.trim()).ok())
        .map(|uuid| Some(RequestId::from(uuid)))
        .ok_or_else(|| ApiError::BadRequest(format!("{IDEMPOTENCY_HEADER} must be a UUID")))
}

fn replayed(request_id: Option<RequestId>) -> Response {
    let body = ReplayResponse {
        status: "already_processed",
        request_id,
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Maps a query outcome to `200 {data, source, elapsed_ms}`.
fn envelope<T: Serialize>(outcome: Outcome<T>) -> Response {
    match outcome {
        Outcome::Completed(served) => {
            let elapsed_ms = served.elapsed_ms();
            let body = Envelope {
                data: served.data,
                source: served.source,
                elapsed_ms,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Outcome::AlreadyProcessed { .. } => replayed(None),
    }
}

/// Maps a command outcome to `204`, or the replay body.
fn no_content(outcome: Outcome<()>, request_id: Option<RequestId>) -> Response {
    match outcome {
        Outcome::Completed(_) => StatusCode::NO_CONTENT.into_response(),
        Outcome::AlreadyProcessed { .. } => replayed(request_id),
    }
}

// -- Handlers --

/// GET /api/products: one page of products.
#[tracing::instrument(skip(state, params))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();

    let query = ListProducts {
        page_number: params.page_number.unwrap_or(1),
        page_size: params
            .page_size
            .unwrap_or(ListProducts::DEFAULT_PAGE_SIZE),
        sort_field: params.sort_field,
        sort_direction: params.sort_direction,
    };
    let outcome: Outcome<PagedResult<ProductDto>> =
        state.catalog.list_products(query, &token).await?;
    Ok(envelope(outcome))
}

/// GET /api/products/{id}
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();

    let outcome = state
        .catalog
        .get_product(GetProductById { id }, &token)
        .await?;

    if let Outcome::Completed(served) = &outcome
        && served.data.is_none()
    {
        return Err(AppError::product_not_found(id).into());
    }
    Ok(envelope(outcome))
}

/// GET /api/products/sku-exists/{sku}
#[tracing::instrument(skip(state))]
pub async fn sku_exists(
    State(state): State<Arc<AppState>>,
    Path(sku): Path<String>,
) -> Result<Response, ApiError> {
    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();

    let outcome: Outcome<SkuAvailability> =
        state.catalog.sku_exists(SkuExists { sku }, &token).await?;
    Ok(envelope(outcome))
}

/// POST /api/products
#[tracing::instrument(skip(state, headers, body))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<ProductBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request_id = request_id(&headers)?.or(body.request_id);
    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();

    let cmd = CreateProduct {
        name: body.name,
        sku: body.sku,
        sale_price: body.sale_price,
        cost: body.cost,
        stock: body.stock,
        request_id,
    };

    match state.catalog.create_product(cmd, &token).await? {
        Outcome::Completed(served) => {
            let id = served.data;
            let location = [(header::LOCATION, format!("/api/products/{id}"))];
            Ok((StatusCode::CREATED, location, Json(CreatedResponse { id })).into_response())
        }
        Outcome::AlreadyProcessed { .. } => Ok(replayed(request_id)),
    }
}

/// PUT /api/products/{id}
#[tracing::instrument(skip(state, headers, body))]
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<UpdateProductBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request_id = request_id(&headers)?.or(body.request_id);
    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();

    let cmd = UpdateProduct {
        id,
        name: body.name,
        sale_price: body.sale_price,
        cost: body.cost,
        stock: body.stock,
        request_id,
    };
    let outcome = state.catalog.update_product(cmd, &token).await?;
    Ok(no_content(outcome, request_id))
}

/// DELETE /api/products/{id}
#[tracing::instrument(skip(state))]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();

    let outcome = state
        .catalog
        .delete_product(DeleteProduct { id }, &token)
        .await?;
    Ok(no_content(outcome, None))
}

/// POST /api/products/{id}/lock-price
pub async fn lock_price(
    state: State<Arc<AppState>>,
    id: Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    set_price_lock(state, id, headers, true).await
}

/// POST /api/products/{id}/unlock-price
pub async fn unlock_price(
    state: State<Arc<AppState>>,
    id: Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    set_price_lock(state, id, headers, false).await
}

#[tracing::instrument(skip(state, headers))]
async fn set_price_lock(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    locked: bool,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let request_id = request_id(&headers)?;
    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();

    let cmd = SetPriceLock {
        id,
        locked,
        request_id,
    };
    let outcome = state.catalog.set_price_lock(cmd, &token).await?;
    Ok(no_content(outcome, request_id))
}
