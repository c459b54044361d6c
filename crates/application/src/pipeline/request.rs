//! Request, handler and result types shared by every pipeline behavior.

use std::time::Duration;

use async_trait::async_trait;
use common::RequestId;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, ValidationErrors};

/// Cache key and lifetime for a cacheable request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    pub key: String,
    /// `None` uses the pipeline's default time-to-live.
    pub ttl: Option<Duration>,
}

impl CachePolicy {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// A command or query sent through the pipeline.
///
/// Caching and idempotency are opt-in capabilities: a request enables them
/// by returning `Some` from [`cache_policy`] or [`idempotency_id`].
///
/// [`cache_policy`]: Request::cache_policy
/// [`idempotency_id`]: Request::idempotency_id
pub trait Request: Serialize + Send + Sync + 'static {
    /// Value produced by the handler.
    type Response: Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Request type name used in logs, metrics and idempotency keys.
    const NAME: &'static str;

    fn cache_policy(&self) -> Option<CachePolicy> {
        None
    }

    fn idempotency_id(&self) -> Option<RequestId> {
        None
    }
}

/// Executes one request type.
#[async_trait]
pub trait Handler<R: Request>: Send + Sync {
    async fn handle(&self, request: &R, cancel: &CancellationToken) -> Result<R::Response>;
}

/// Field rules for one request type.
///
/// Validators only read the request; several may run concurrently.
#[async_trait]
pub trait Validator<R: Request>: Send + Sync {
    async fn validate(&self, request: &R) -> ValidationErrors;
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Served from the memoization cache.
    Cache,
    /// Computed by the handler.
    Source,
}

/// A response annotated with its provenance and timing.
#[derive(Debug, Clone, PartialEq)]
pub struct Served<T> {
    pub data: T,
    pub source: DataSource,
    /// Time spent in the innermost behavior that produced the annotation.
    pub elapsed: Duration,
}

impl<T> Served<T> {
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Result of a successful trip through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The handler ran now, or a cached result was returned.
    Completed(Served<T>),
    /// The idempotency key had already been processed; nothing ran.
    AlreadyProcessed { key: String },
}

impl<T> Outcome<T> {
    /// Returns the data if the request completed now.
    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(served) => Some(served.data),
            Outcome::AlreadyProcessed { .. } => None,
        }
    }

    pub fn is_already_processed(&self) -> bool {
        matches!(self, Outcome::AlreadyProcessed { .. })
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Completed(served) => Outcome::Completed(Served {
                data: f(served.data),
                source: served.source,
                elapsed: served.elapsed,
            }),
            Outcome::AlreadyProcessed { key } => Outcome::AlreadyProcessed { key },
        }
    }
}
