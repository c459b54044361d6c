//! Duplicate suppression for commands carrying a client request id.

use std::future::Future;

use common::RequestId;
use store::IdempotencyStore;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

use super::{KeyedLocks, Outcome, Request, Served};

/// Durable key for a request id: `"{request type}:{id}"`.
pub fn idempotency_key<R: Request>(id: RequestId) -> String {
    format!("{}:{}", R::NAME, id)
}

/// Runs `next` at most once per idempotency key.
///
/// Requests without an id pass straight through. A key is only marked after
/// `next` succeeded, so a failed or cancelled attempt can be retried with the
/// same id. Duplicates racing inside this process wait on the same key lock.
pub async fn guard<R, F>(
    store: &dyn IdempotencyStore,
    locks: &KeyedLocks,
    request: &R,
    cancel: &CancellationToken,
    next: F,
) -> Result<Outcome<R::Response>>
where
    R: Request,
    F: Future<Output = Result<Served<R::Response>>>,
{
    let Some(id) = request.idempotency_id() else {
        return next.await.map(Outcome::Completed);
    };

    let key = idempotency_key::<R>(id);
    let _guard = locks.lock(&key, cancel).await?;

    if store.has_processed(&key, cancel).await? {
        tracing::info!(key, "Request already processed");
        metrics::counter!("catalog_idempotent_replays_total", "request" => R::NAME).increment(1);
        return Ok(Outcome::AlreadyProcessed { key });
    }

    let served = next.await?;

    // The work is durable at this point; record it even if the caller has gone away.
    store
        .mark_processed(&key, &CancellationToken::new())
        .await?;

    Ok(Outcome::Completed(served))
}
