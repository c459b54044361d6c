use std::collections::BTreeMap;

use domain::DomainError;
use serde::Serialize;
use store::StoreError;
use thiserror::Error;

/// Field-level validation failures, grouped by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message for `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Records `message` for `field` unless `ok` holds.
    pub fn ensure(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        if !ok {
            self.add(field, message);
        }
    }

    /// Moves every message from `other` into `self`.
    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Messages recorded for one field.
    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// Iterates over fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Returns `Err(AppError::Validation)` if any message was recorded.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Errors surfaced by the request pipeline and handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// The request was malformed; no side effect happened.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// A business rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The request was cancelled before it completed.
    #[error("Request cancelled")]
    Cancelled,

    /// Persistence failed.
    #[error(transparent)]
    Store(StoreError),

    /// A cached value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Cancelled => AppError::Cancelled,
            StoreError::NotFound(id) => AppError::NotFound {
                entity: "Product",
                id: id.to_string(),
            },
            other => AppError::Store(other),
        }
    }
}

impl AppError {
    pub fn product_not_found(id: impl std::fmt::Display) -> Self {
        AppError::NotFound {
            entity: "Product",
            id: id.to_string(),
        }
    }

    /// Short machine-readable kind, used in logs and error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::Domain(_) => "business_rule",
            AppError::NotFound { .. } => "not_found",
            AppError::Cancelled => "cancelled",
            AppError::Store(StoreError::Conflict { .. }) => "conflict",
            AppError::Store(_) | AppError::Serialization(_) => "internal",
        }
    }
}

/// Result type for application operations.
pub type Result<T> = std::result::Result<T, AppError>;
