//! Retry with exponential backoff for remote calls

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::errors::RemoteError;

/// Backoff schedule in milliseconds, the last step repeats
const BACKOFF_MS: [u64; 3] = [500, 1000, 2000];

/// How often and how patiently to retry a remote call
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Multiplier applied to the backoff schedule
    pub backoff_scale: f64,
    /// Bound on each individual attempt
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, attempt_timeout: Duration) -> Self {
        Self {
            max_retries,
            backoff_scale: 1.0,
            attempt_timeout,
        }
    }

    /// Policy without sleeping between attempts
    pub fn immediate(max_retries: u32, attempt_timeout: Duration) -> Self {
        Self {
            max_retries,
            backoff_scale: 0.0,
            attempt_timeout,
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        let base = BACKOFF_MS
            .get(attempt as usize)
            .copied()
            .unwrap_or(BACKOFF_MS[BACKOFF_MS.len() - 1]);
        Duration::from_millis(base).mul_f64(self.backoff_scale)
    }

    /// Run `f` until it succeeds, fails with a non-retryable error, or retries run out
    ///
    /// An attempt exceeding `attempt_timeout` counts as `RemoteError::Timeout`.
    pub async fn run<F, Fut, T>(&self, operation: &str, f: F) -> Result<T, RemoteError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.attempt_timeout, f()).await {
                Ok(result) => result,
                Err(_) => Err(RemoteError::Timeout),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() || attempt >= self.max_retries => return Err(e),
                Err(e) => {
                    let delay = self.delay(attempt);
                    attempt += 1;
                    warn!(
                        operation = operation,
                        attempt = attempt,
                        max = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying remote operation"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3, Duration::from_secs(1));

        let result = policy
            .run("list", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(RemoteError::Network("reset".into()))
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(2, Duration::from_secs(1));

        let result: Result<(), _> = policy
            .run("list", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RemoteError::RateLimited)
            })
            .await;

        assert_eq!(result, Err(RemoteError::RateLimited));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_permanent_errors() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3, Duration::from_secs(1));

        let result: Result<(), _> = policy
            .run("list", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RemoteError::Forbidden("denied".into()))
            })
            .await;

        assert!(matches!(result, Err(RemoteError::Forbidden(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempt_timeout() {
        let policy = RetryPolicy::immediate(0, Duration::from_millis(10));

        let result: Result<(), _> = policy
            .run("list", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert_eq!(result, Err(RemoteError::Timeout));
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::new(5, Duration::from_secs(1));
        assert_eq!(policy.delay(0), Duration::from_millis(500));
        assert_eq!(policy.delay(2), Duration::from_millis(2000));
        assert_eq!(policy.delay(4), Duration::from_millis(2000));
        assert_eq!(
            RetryPolicy::immediate(1, Duration::from_secs(1)).delay(0),
            Duration::ZERO
        );
    }
}
