//! Read-through memoization with one in-flight computation per key.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

use super::{Cache, DataSource, KeyedLocks, Outcome, Request, Served};

/// Shared state of the caching behavior.
#[derive(Clone)]
pub struct CacheLayer {
    cache: Arc<dyn Cache>,
    locks: KeyedLocks,
    default_ttl: Duration,
}

impl CacheLayer {
    pub fn new(cache: Arc<dyn Cache>, locks: KeyedLocks, default_ttl: Duration) -> Self {
        Self {
            cache,
            locks,
            default_ttl,
        }
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.cache.get(key).await?;
        match serde_json::from_value(value) {
            Ok(data) => Some(data),
            Err(err) => {
                tracing::warn!(key, error = %err, "Dropping undecodable cache entry");
                self.cache.remove(key).await;
                None
            }
        }
    }
}

/// Serves cacheable requests from the cache, populating it on a miss.
///
/// Requests without a cache policy pass straight through. The returned
/// result carries its provenance and the time spent in this behavior.
pub async fn memoize<R, F>(
    layer: &CacheLayer,
    request: &R,
    cancel: &CancellationToken,
    next: F,
) -> Result<Outcome<R::Response>>
where
    R: Request,
    F: Future<Output = Result<Outcome<R::Response>>>,
{
    let Some(policy) = request.cache_policy() else {
        return next.await;
    };

    let start = Instant::now();
    let from_cache = |data: R::Response| {
        metrics::counter!("catalog_cache_hits_total", "request" => R::NAME).increment(1);
        Outcome::Completed(Served {
            data,
            source: DataSource::Cache,
            elapsed: start.elapsed(),
        })
    };

    if let Some(data) = layer.lookup(&policy.key).await {
        return Ok(from_cache(data));
    }

    let _guard = layer.locks.lock(&policy.key, cancel).await?;

    // Another request may have filled the entry while we waited.
    if let Some(data) = layer.lookup(&policy.key).await {
        return Ok(from_cache(data));
    }

    metrics::counter!("catalog_cache_misses_total", "request" => R::NAME).increment(1);
    let outcome = next.await?;

    let served = match outcome {
        Outcome::Completed(served) => served,
        already @ Outcome::AlreadyProcessed { .. } => return Ok(already),
    };

    // Absent results are not memoized; the next request looks again.
    let value = serde_json::to_value(&served.data)?;
    if !value.is_null() {
        let ttl = policy.ttl.unwrap_or(layer.default_ttl);
        layer.cache.set(&policy.key, value, ttl).await;
    }

    Ok(Outcome::Completed(Served {
        data: served.data,
        source: DataSource::Source,
        elapsed: start.elapsed(),
    }))
}
