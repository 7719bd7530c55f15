use std::future::Future;

use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

/// Tries each candidate in order and returns the first success.
///
/// Only `NotFound` moves on to the next candidate. Any other failure is
/// returned at once. When every candidate misses, the last `NotFound` is
/// returned.
pub async fn first_success<T, F, Fut>(
    what: &str,
    candidates: &[&'static str],
    mut attempt: F,
) -> AppResult<T>
where
    F: FnMut(&'static str) -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut last_error = None;

    for &candidate in candidates {
        match attempt(candidate).await {
            Ok(value) => return Ok(value),
            Err(e @ AppError::NotFound(_)) => {
                debug!(error = %e, candidate, what, "Candidate had nothing, trying next");
                last_error = Some(e);
            }
            Err(e) => {
                warn!(error = %e, candidate, what, "Candidate resolver failed");
                return Err(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| AppError::NotFound(what.to_string())))
}
