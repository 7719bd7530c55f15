use std::future::Future;
use std::time::Duration;

use actix_web::rt::time::timeout;

use crate::error::{AppError, AppResult};

/// Bounds a backend call; an elapsed deadline is reported as `Transient`.
pub async fn bounded<T, Fut>(limit: Duration, what: &str, fut: Fut) -> AppResult<T>
where
    Fut: Future<Output = AppResult<T>>,
{
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(what, timeout_ms = limit.as_millis() as u64, "Backend call timed out");
            Err(AppError::Transient(format!("{what} timed out")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::rt::time::sleep;

    #[actix_web::test]
    async fn passes_through_fast_results() {
        let value = bounded(Duration::from_secs(1), "lookup", async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[actix_web::test]
    async fn slow_call_becomes_transient() {
        let err = bounded(Duration::from_millis(10), "lookup", async {
            sleep(Duration::from_millis(200)).await;
            Ok(())
        })
        .await
        .unwrap_err();

        assert_eq!(err, AppError::Transient("lookup timed out".to_string()));
    }
}
