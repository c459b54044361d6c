//! Client error types.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

/// Problem body returned by the API for every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Problem {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub errors: BTreeMap<String, Vec<String>>,
}

/// Errors that can occur when calling the catalog API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response, or its body could not be read.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with an error status.
    #[error("API error ({status}): {} - {}", problem.title, problem.detail)]
    Api { status: u16, problem: Problem },

    /// The base URL or a path segment could not be turned into a URL.
    #[error("Invalid URL: {0}")]
    Url(String),
}

impl ClientError {
    /// HTTP status of an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(err) => err.status().map(|s| s.as_u16()),
            ClientError::Url(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Api { problem, .. } if problem.kind == "validation")
    }

    pub fn is_business_rule(&self) -> bool {
        matches!(self, ClientError::Api { problem, .. } if problem.kind == "business_rule")
    }

    /// Messages the server attached to `field`.
    pub fn field_errors(&self, field: &str) -> &[String] {
        match self {
            ClientError::Api { problem, .. } => problem
                .errors
                .get(field)
                .map(Vec::as_slice)
                .unwrap_or_default(),
            _ => &[],
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
