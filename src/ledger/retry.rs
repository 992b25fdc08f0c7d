//! Retry with exponential back-off, raced against cancellation

use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::config::RetryConfig;
use crate::error::{DocGraphError, DocGraphResult};

/// Run `call` until it succeeds, fails permanently, or attempts run out
///
/// Only errors classified transient by [`DocGraphError::is_transient`] are
/// retried. Exhaustion yields [`DocGraphError::RemoteUnavailable`] carrying
/// the attempt count; cancellation at any point yields
/// [`DocGraphError::Cancelled`].
pub async fn with_retry<T, F, Fut>(
    retry: &RetryConfig,
    cancel: &CancellationToken,
    operation: &str,
    mut call: F,
) -> DocGraphResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DocGraphResult<T>>,
{
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DocGraphError::Cancelled),
            result = call() => result,
        };

        let error = match result {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => e,
            Err(e) => return Err(e),
        };
        if attempt >= max_attempts {
            return Err(DocGraphError::RemoteUnavailable {
                attempts: attempt,
                last_error: error.to_string(),
            });
        }

        let delay = retry.backoff(attempt);
        warn!(
            "{} failed (attempt {}/{}): {}; retrying in {:?}",
            operation, attempt, max_attempts, error, delay
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DocGraphError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
