//! API error types with HTTP response mapping.
//!
//! Every error leaves the server as a problem body:
//! `{kind, title, status, detail, errors?}`.

use std::collections::BTreeMap;

use application::AppError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use store::StoreError;

/// Detail shown for internal errors outside development.
pub const HIDDEN_DETAIL: &str = "An unexpected error occurred";

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub kind: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

/// Full message of an internal error, attached to the response so the
/// development-only layer can reveal it.
#[derive(Debug, Clone)]
pub struct InternalDetail(pub String);

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// The request could not be decoded.
    BadRequest(String),
    /// Error raised by the application layer.
    App(AppError),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError::App(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::App(err) => match err {
                AppError::Validation(_) | AppError::Domain(_) => StatusCode::BAD_REQUEST,
                AppError::NotFound { .. } => StatusCode::NOT_FOUND,
                AppError::Store(StoreError::Conflict { .. }) => StatusCode::CONFLICT,
                AppError::Cancelled => StatusCode::REQUEST_TIMEOUT,
                AppError::Store(_) | AppError::Serialization(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn problem(&self) -> Problem {
        let status = self.status();
        let (kind, title, detail, errors) = match self {
            ApiError::BadRequest(msg) => ("bad_request", "Bad request", msg.clone(), None),
            ApiError::App(err) => match err {
                AppError::Validation(errors) => (
                    err.kind(),
                    "Validation failed",
                    "One or more validation errors occurred".to_string(),
                    Some(
                        errors
                            .iter()
                            .map(|(field, messages)| (field.to_string(), messages.to_vec()))
                            .collect(),
                    ),
                ),
                AppError::Domain(_) => (err.kind(), "Business rule violation", err.to_string(), None),
                AppError::NotFound { .. } => (err.kind(), "Resource not found", err.to_string(), None),
                AppError::Store(StoreError::Conflict { .. }) => {
                    (err.kind(), "Conflict", err.to_string(), None)
                }
                AppError::Cancelled => (err.kind(), "Request cancelled", err.to_string(), None),
                AppError::Store(_) | AppError::Serialization(_) => (
                    err.kind(),
                    "Internal server error",
                    HIDDEN_DETAIL.to_string(),
                    None,
                ),
            },
        };

        Problem {
            kind: kind.to_string(),
            title: title.to_string(),
            status: status.as_u16(),
            detail,
            errors,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let problem = self.problem();

        let mut response = (status, Json(problem)).into_response();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = ?self, "internal server error");
            if let ApiError::App(err) = &self {
                response
                    .extensions_mut()
                    .insert(InternalDetail(err.to_string()));
            }
        }
        response
    }
}

/// Replaces the hidden detail of internal errors with the real message.
///
/// Installed on the router only in development.
pub async fn reveal_internal_detail(mut response: Response) -> Response {
    let Some(InternalDetail(detail)) = response.extensions_mut().remove::<InternalDetail>() else {
        return response;
    };

    let status = response.status();
    let problem = Problem {
        kind: "internal".to_string(),
        title: "Internal server error".to_string(),
        status: status.as_u16(),
        detail,
        errors: None,
    };
    (status, Json(problem)).into_response()
}

/// Errors that stop the server from starting or serving.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("Could not connect to the database: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Could not install the metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use application::ValidationErrors;
    use common::ProductId;
    use domain::DomainError;

    use super::*;

    async fn body(response: Response) -> Problem {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_maps_to_400_with_field_errors() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "Name is required");
        let response = ApiError::from(AppError::Validation(errors)).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let problem = body(response).await;
        assert_eq!(problem.kind, "validation");
        assert_eq!(problem.title, "Validation failed");
        assert_eq!(
            problem.errors.unwrap()["name"],
            vec!["Name is required".to_string()]
        );
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (AppError::Domain(DomainError::PriceLocked), StatusCode::BAD_REQUEST),
            (AppError::product_not_found(ProductId::new()), StatusCode::NOT_FOUND),
            (
                AppError::Store(StoreError::Conflict {
                    constraint: "ux_products_sku".to_string(),
                }),
                StatusCode::CONFLICT,
            ),
            (AppError::Cancelled, StatusCode::REQUEST_TIMEOUT),
            (
                AppError::Store(StoreError::NotFound(ProductId::new())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_internal_detail_hidden_until_revealed() {
        let err = || {
            ApiError::from(AppError::Store(StoreError::Database(
                sqlx::Error::PoolTimedOut,
            )))
        };

        let hidden = body(err().into_response()).await;
        assert_eq!(hidden.detail, HIDDEN_DETAIL);

        let revealed = body(reveal_internal_detail(err().into_response()).await).await;
        assert!(revealed.detail.contains("pool timed out"));
        assert_eq!(revealed.status, 500);
    }

    #[tokio::test]
    async fn test_reveal_leaves_other_responses_alone() {
        let response = ApiError::BadRequest("Invalid product id".to_string()).into_response();
        let problem = body(reveal_internal_detail(response).await).await;
        assert_eq!(problem.kind, "bad_request");
        assert_eq!(problem.detail, "Invalid product id");
    }
}
