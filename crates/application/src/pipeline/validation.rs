//! Field validation before any side effect.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::join_all;

use crate::error::{AppError, Result, ValidationErrors};

use super::{Request, Validator};

/// Runs every validator concurrently and only continues if none reported an error.
pub async fn validate<R, T, F>(
    request: &R,
    validators: &[Arc<dyn Validator<R>>],
    next: F,
) -> Result<T>
where
    R: Request,
    F: Future<Output = Result<T>>,
{
    if !validators.is_empty() {
        let reports = join_all(validators.iter().map(|v| v.validate(request))).await;

        let mut errors = ValidationErrors::new();
        for report in reports {
            errors.merge(report);
        }

        if !errors.is_empty() {
            metrics::counter!("catalog_validation_failures_total", "request" => R::NAME)
                .increment(1);
            return Err(AppError::Validation(errors));
        }
    }

    next.await
}
