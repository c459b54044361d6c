//! Request pipeline.
//!
//! Every request runs through the same nested behaviors:
//!
//! ```text
//! logging -> validation -> caching -> idempotency -> handler
//! ```
//!
//! Each behavior receives the inner part of the chain as an unstarted future
//! and decides whether to await it. Errors unwind outward unchanged.

pub mod cache;
pub mod caching;
pub mod idempotency;
pub mod locks;
pub mod logging;
pub mod request;
pub mod validation;

use std::sync::Arc;
use std::time::{Duration, Instant};

use store::IdempotencyStore;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

pub use cache::{Cache, InMemoryCache};
pub use caching::CacheLayer;
pub use idempotency::idempotency_key;
pub use locks::{KeyGuard, KeyedLocks};
pub use request::{CachePolicy, DataSource, Handler, Outcome, Request, Served, Validator};

/// Handler and validators registered for one request type.
pub struct Route<R: Request> {
    handler: Arc<dyn Handler<R>>,
    validators: Vec<Arc<dyn Validator<R>>>,
}

impl<R: Request> Route<R> {
    pub fn new(handler: Arc<dyn Handler<R>>) -> Self {
        Self {
            handler,
            validators: Vec::new(),
        }
    }

    /// Adds a validator. All validators of a route run concurrently.
    pub fn validator(mut self, validator: Arc<dyn Validator<R>>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }
}

/// Shared pipeline state: the cache, the key lock table and the idempotency store.
#[derive(Clone)]
pub struct Pipeline {
    cache: CacheLayer,
    idempotency: Arc<dyn IdempotencyStore>,
    locks: KeyedLocks,
}

impl Pipeline {
    pub fn new(
        cache: Arc<dyn Cache>,
        idempotency: Arc<dyn IdempotencyStore>,
        default_ttl: Duration,
    ) -> Self {
        let locks = KeyedLocks::new();
        Self {
            cache: CacheLayer::new(cache, locks.clone(), default_ttl),
            idempotency,
            locks,
        }
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        self.cache.cache()
    }

    pub fn locks(&self) -> &KeyedLocks {
        &self.locks
    }

    /// Sends a request through every behavior to its handler.
    pub async fn send<R: Request>(
        &self,
        route: &Route<R>,
        request: &R,
        cancel: &CancellationToken,
    ) -> Result<Outcome<R::Response>> {
        let handler = async {
            let start = Instant::now();
            let data = route.handler.handle(request, cancel).await?;
            Ok(Served {
                data,
                source: DataSource::Source,
                elapsed: start.elapsed(),
            })
        };

        let idempotent = idempotency::guard(
            self.idempotency.as_ref(),
            &self.locks,
            request,
            cancel,
            handler,
        );
        let cached = caching::memoize(&self.cache, request, cancel, idempotent);
        let validated = validation::validate(request, &route.validators, cached);

        logging::log(request, validated).await
    }
}
