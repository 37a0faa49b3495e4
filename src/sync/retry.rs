//! Bounded retry with exponential backoff for startup dependencies

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};

/// How hard to try reaching a startup dependency
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (at least 1)
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_backoff: Duration,
    /// Upper bound for the delay between attempts
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Set the number of attempts (at least 1)
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the first backoff delay
    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Set the backoff cap
    pub fn max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// Delay after failed attempt number `attempt` (1-based)
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Run `op` until it succeeds or the policy is exhausted
///
/// Exhaustion is reported as [`Error::Bootstrap`] carrying the last error.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    dependency: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(dependency, attempt, "Dependency reachable");
                }
                return Ok(value);
            }
            Err(e) if attempt >= max_attempts => {
                tracing::error!(
                    dependency,
                    attempts = attempt,
                    error = %e,
                    "Dependency unreachable, giving up"
                );
                return Err(Error::Bootstrap {
                    attempts: attempt,
                    source: Box::new(e),
                });
            }
            Err(e) => {
                let backoff = policy.backoff_after(attempt);
                tracing::warn!(
                    dependency,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Dependency unavailable, retrying"
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio_test::assert_ok;

    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default()
            .initial_backoff(Duration::from_millis(100))
            .max_backoff(Duration::from_millis(500));

        assert_eq!(policy.backoff_after(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_after(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_after(3), Duration::from_millis(400));
        assert_eq!(policy.backoff_after(4), Duration::from_millis(500));
        assert_eq!(policy.backoff_after(40), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default().max_attempts(5);
        let counter = &calls;

        let value = retry_with_backoff(&policy, "test", move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(Error::Upstream("refused".into()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(assert_ok!(value), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_is_bootstrap_failure() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default().max_attempts(3);
        let counter = &calls;

        let result: Result<()> = retry_with_backoff(&policy, "test", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::Upstream("refused".into()))
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, Error::Bootstrap { attempts: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
