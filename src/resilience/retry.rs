//! Fixed-schedule retry for Candle Source loads.
//!
//! §4.2 and §7 pin the exact schedule: waiting 2s, 4s, then 6s between
//! attempts. This is not exponential backoff; it is precisely these three
//! durations, in this order, and no more. Three waits between attempts
//! means four attempts in total (the wait follows every failure, including
//! the third, before a final fourth try).

use std::future::Future;
use std::time::Duration;

/// The literal backoff schedule between Candle Source load attempts.
const BACKOFF: [Duration; 3] = [Duration::from_secs(2), Duration::from_secs(4), Duration::from_secs(6)];

/// A Candle Source load failed after exhausting all retry attempts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("candle source load failed after {attempts} attempts: {last_error}")]
pub struct RetryError {
    /// Number of attempts made (always 4 on exhaustion).
    pub attempts: u32,
    /// The error returned by the final attempt.
    pub last_error: String,
}

/// Run `load`, waiting 2s, 4s, then 6s between attempts on failure, giving
/// up after the fourth attempt that follows the 6s wait.
///
/// # Errors
///
/// Returns `RetryError` if all four attempts fail.
pub async fn retry_candle_source_load<T, E, F, Fut>(mut load: F) -> Result<T, RetryError>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last_error = String::new();
    for (attempt, wait) in BACKOFF.iter().copied().map(Some).chain(std::iter::once(None)).enumerate() {
        match load().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                last_error = err.to_string();
                tracing::warn!(attempt = attempt + 1, error = %last_error, "candle source load failed");
                if let Some(wait) = wait {
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
    Err(RetryError {
        attempts: 4,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_first_attempt_without_waiting() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, RetryError> = retry_candle_source_load(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<u32, String>(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_second_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, RetryError> = retry_candle_source_load(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err::<u32, String>("transient".to_string())
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_four_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, RetryError> = retry_candle_source_load(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<u32, String>("down".to_string()) }
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts, 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(err.last_error.contains("down"));
    }
}
