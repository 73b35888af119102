//! Collaborator retry with exponential backoff.
//!
//! Registry and ledger calls are transient-failure prone; retry them with
//! capped exponential backoff (2^n seconds). Only errors the caller marks
//! retryable are retried - state-machine errors surface immediately.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Maximum retry attempts before giving up.
const MAX_RETRIES: u32 = 5;

/// Maximum backoff duration (one minute). The scheduler/dispatcher tick
/// again anyway; long in-call backoff just delays the rest of the batch.
const MAX_BACKOFF_SECS: u64 = 60;

/// Retry an async operation with exponential backoff.
///
/// Backoff: 2^attempt seconds (1, 2, 4, 8, 16), capped at
/// `MAX_BACKOFF_SECS`. Returns the last error once `is_retryable` says no
/// or the attempts are exhausted.
pub async fn retry_with_backoff<F, Fut, T, E>(
    mut operation: F,
    is_retryable: fn(&E) -> bool,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                if !is_retryable(&err) || attempt >= MAX_RETRIES {
                    return Err(err);
                }

                let backoff_secs = 2u64.pow(attempt).min(MAX_BACKOFF_SECS);
                tracing::warn!(
                    attempt = attempt + 1,
                    backoff_secs,
                    error = %err,
                    "transient failure, retrying"
                );

                sleep(Duration::from_secs(backoff_secs)).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::council::error::CouncilError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_retry_succeeds_immediately() {
        let result = retry_with_backoff(
            || async { Ok::<_, CouncilError>(42) },
            CouncilError::is_transient,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_after_transient_failure() {
        let attempt = Arc::new(AtomicU32::new(0));
        let attempt_clone = attempt.clone();

        let result = retry_with_backoff(
            move || {
                let attempt = attempt_clone.clone();
                async move {
                    if attempt.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(CouncilError::Unavailable("ledger timeout".to_string()))
                    } else {
                        Ok(7)
                    }
                }
            },
            CouncilError::is_transient,
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempt.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_gives_up_on_fatal_error() {
        let attempt = Arc::new(AtomicU32::new(0));
        let attempt_clone = attempt.clone();

        let result: Result<u32, CouncilError> = retry_with_backoff(
            move || {
                let attempt = attempt_clone.clone();
                async move {
                    attempt.fetch_add(1, Ordering::SeqCst);
                    Err(CouncilError::Validation("bad input".to_string()))
                }
            },
            CouncilError::is_transient,
        )
        .await;

        assert!(matches!(result, Err(CouncilError::Validation(_))));
        assert_eq!(attempt.load(Ordering::SeqCst), 1);
    }
}
