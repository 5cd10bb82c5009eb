//! Retry with exponential backoff for provider calls.

use std::future::Future;
use std::time::Duration;

use agent_core::{AgentError, Result};

/// Attempts and backoff for transient provider failures
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Base delay; attempt `n` waits `backoff_factor * 2^(n-1)` before retrying
    pub backoff_factor: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_factor: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff_factor
            .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts run out
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if self.max_attempts == 0 {
            return Err(AgentError::Config("max_attempts must be at least 1".into()));
        }

        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis(),
                        error = %err,
                        "Provider call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) if err.is_retryable() => {
                    let detail =
                        format!("request failed after {} attempts: {err}", self.max_attempts);
                    return Err(match err {
                        AgentError::RateLimited(_) => AgentError::RateLimited(detail),
                        _ => AgentError::ProviderUnavailable(detail),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_millis(500));
        assert_eq!(policy.delay(2), Duration::from_secs(1));
        assert_eq!(policy.delay(3), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_errors_then_succeeds() {
        let attempts = AtomicU32::new(0);
        let result = RetryPolicy::default()
            .run(|| async {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(AgentError::ProviderUnavailable("connection refused".into()))
                } else {
                    Ok("hello")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "hello");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let attempts = AtomicU32::new(0);
        let err = RetryPolicy::default()
            .run(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(AgentError::Timeout("slow".into()))
            })
            .await
            .unwrap_err();

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(err.to_string().contains("after 3 attempts"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_rate_limit_stays_rate_limited() {
        let err = RetryPolicy::default()
            .run(|| async { Err::<(), _>(AgentError::RateLimited("429".into())) })
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::RateLimited(_)));
        assert!(err.to_string().contains("after 3 attempts"));
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let attempts = AtomicU32::new(0);
        let err = RetryPolicy::default()
            .run(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(AgentError::Provider("empty response".into()))
            })
            .await
            .unwrap_err();

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(err, AgentError::Provider(_)));
    }
}
