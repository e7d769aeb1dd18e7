//! Bounded retry with a fixed delay.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// How many times an operation is attempted and how long to wait in between.
///
/// Used for token warm-up validation and for transport-level retries of
/// submissions. Tests shrink it or use [`RetryPolicy::none`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (values below 1 behave as 1).
    pub attempts: u32,
    /// Fixed pause between two attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::token_warmup()
    }
}

impl RetryPolicy {
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Policy for waiting until a freshly issued token is accepted:
    /// 10 attempts, 1 second apart.
    pub const fn token_warmup() -> Self {
        Self::new(10, Duration::from_secs(1))
    }

    /// `retry_count` attempts with a 1 second pause, at least one attempt.
    pub fn transport(retry_count: u32) -> Self {
        Self::new(retry_count.max(1), Duration::from_secs(1))
    }

    /// Single attempt, no waiting.
    pub const fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Longest time spent sleeping if every attempt fails.
    pub fn max_wait(&self) -> Duration {
        self.delay * self.attempts.max(1).saturating_sub(1)
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or
    /// the attempts are used up. `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut, R>(
        &self,
        operation: &str,
        mut op: F,
        retryable: R,
    ) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
        E: Display,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if retryable(&e) && attempt < attempts => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn token_warmup_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 10);
        assert_eq!(policy.delay, Duration::from_secs(1));
        assert_eq!(policy.max_wait(), Duration::from_secs(9));
    }

    #[test]
    fn transport_policy_has_at_least_one_attempt() {
        assert_eq!(RetryPolicy::transport(0).attempts, 1);
        assert_eq!(RetryPolicy::transport(3).attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_attempts_with_fixed_spacing() {
        let policy = RetryPolicy::token_warmup();
        let mut stamps = Vec::new();

        let result: Result<(), String> = policy
            .run(
                "validate",
                |_| {
                    stamps.push(Instant::now());
                    async { Err("connection refused".to_string()) }
                },
                |_| true,
            )
            .await;

        assert!(result.is_err());
        assert_eq!(stamps.len(), 10);
        for pair in stamps.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_first_success() {
        let policy = RetryPolicy::new(5, Duration::from_secs(1));
        let mut calls = 0;

        let result: Result<u32, String> = policy
            .run(
                "validate",
                |attempt| {
                    calls += 1;
                    async move {
                        if attempt < 3 {
                            Err("not yet".to_string())
                        } else {
                            Ok(attempt)
                        }
                    }
                },
                |_| true,
            )
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn non_retryable_error_returns_immediately() {
        let policy = RetryPolicy::new(10, Duration::from_secs(60));
        let mut calls = 0;

        let result: Result<(), String> = policy
            .run(
                "validate",
                |_| {
                    calls += 1;
                    async { Err("unauthorized".to_string()) }
                },
                |e| e != "unauthorized",
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
