//! Explicit retry policy for transient provider failures.
//!
//! The policy is a plain value passed into each adapter call site, so it can
//! be tested in isolation by injecting an operation that fails N times.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::core::providers::ProviderError;

/// Exponential backoff schedule: `base_delay` doubling per attempt, capped at
/// `max_delay`, with bounded random jitter added on top.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt; budget 3 means up to 4 calls total.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            jitter: Duration::ZERO,
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry number `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);
        if self.jitter.is_zero() {
            return exp;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64);
        exp + Duration::from_millis(jitter_ms)
    }

    /// Run `op` until it succeeds, fails permanently, or exhausts the retry
    /// budget. Only [`ProviderError::is_transient`] failures are retried.
    pub async fn run<T, Fut, Op>(&self, mut op: Op) -> Result<T, ProviderError>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient provider error, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
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

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(1), Duration::from_millis(4))
    }

    /// Operation that fails transiently `failures` times before succeeding.
    fn flaky(failures: u32) -> (AtomicU32, impl Fn(&AtomicU32) -> Result<u32, ProviderError>) {
        let calls = AtomicU32::new(0);
        let op = move |calls: &AtomicU32| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < failures {
                Err(ProviderError::Transient(format!("failure {n}")))
            } else {
                Ok(n)
            }
        };
        (calls, op)
    }

    #[tokio::test]
    async fn succeeds_within_budget() {
        // 3 transient failures, success on the 4th call: within a budget of
        // 3 retries + 1 initial attempt.
        let policy = fast_policy(3);
        let (calls, op) = flaky(3);
        let result = policy.run(|| async { op(&calls) }).await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn exhausts_budget_on_persistent_failure() {
        let policy = fast_policy(3);
        let (calls, op) = flaky(10);
        let result: Result<u32, _> = policy.run(|| async { op(&calls) }).await;
        assert!(result.is_err());
        // 1 initial + 3 retries
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let policy = fast_policy(5);
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = policy
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::Permanent("rejected".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(
            5,
            Duration::from_millis(100),
            Duration::from_millis(450),
        );
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        // Capped
        assert_eq!(policy.delay_for(3), Duration::from_millis(450));
        assert_eq!(policy.delay_for(10), Duration::from_millis(450));
    }

    #[test]
    fn jitter_stays_bounded() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10), Duration::from_secs(1))
            .with_jitter(Duration::from_millis(50));
        for _ in 0..32 {
            let delay = policy.delay_for(0);
            assert!(delay >= Duration::from_millis(10));
            assert!(delay <= Duration::from_millis(60));
        }
    }
}
