//! Outermost behavior: request logging and timing.

use std::future::Future;
use std::time::Instant;

use crate::error::Result;

use super::Request;

/// Logs the request and the elapsed time of everything nested inside it.
///
/// The result is passed through untouched. Failures are logged at warn
/// level instead of the elapsed-time line.
pub async fn log<R, T, F>(request: &R, next: F) -> Result<T>
where
    R: Request,
    F: Future<Output = Result<T>>,
{
    let start = Instant::now();
    let payload = serde_json::to_string(request)
        .unwrap_or_else(|err| format!("<unserializable request: {err}>"));

    tracing::info!(request_type = R::NAME, request = %payload, "Handling request");
    metrics::counter!("catalog_requests_total", "request" => R::NAME).increment(1);

    let result = next.await;
    let elapsed = start.elapsed();

    metrics::histogram!("catalog_request_duration_seconds", "request" => R::NAME)
        .record(elapsed.as_secs_f64());

    match &result {
        Ok(_) => tracing::info!(
            request_type = R::NAME,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "Request handled"
        ),
        Err(err) => tracing::warn!(
            request_type = R::NAME,
            kind = err.kind(),
            error = %err,
            "Request failed"
        ),
    }

    result
}
