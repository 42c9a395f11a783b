//! Bounded, fixed-interval retry.

use crate::config::RetryConfig;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero behaves like one.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// A single attempt with no waiting.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Run `attempt` until it yields a value or attempts run out.
    pub async fn run<T, F, Fut>(&self, attempt: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        with_retry(attempt, self.max_attempts, self.delay).await
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.attempts, config.delay())
    }
}

/// Call `attempt` up to `max_attempts` times, sleeping `delay` between
/// calls (never before the first or after the last). Returns the first
/// value produced, or `None` when every attempt came back empty.
pub async fn with_retry<T, F, Fut>(mut attempt: F, max_attempts: u32, delay: Duration) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let max_attempts = max_attempts.max(1);
    for n in 1..=max_attempts {
        if n > 1 {
            tokio::time::sleep(delay).await;
        }
        if let Some(value) = attempt().await {
            if n > 1 {
                debug!("succeeded on attempt {}/{}", n, max_attempts);
            }
            return Some(value);
        }
        debug!("attempt {}/{} came back empty", n, max_attempts);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn succeeds_on(n: u32, calls: &AtomicU32) -> impl FnMut() -> std::future::Ready<Option<&'static str>> + '_ {
        move || {
            let c = calls.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready((c >= n).then_some("found"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_within_budget() {
        let calls = AtomicU32::new(0);
        let delay = Duration::from_millis(1000);
        let start = Instant::now();

        let result = with_retry(succeeds_on(3, &calls), 5, delay).await;

        assert_eq!(result, Some("found"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), delay * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_budget() {
        let calls = AtomicU32::new(0);
        let delay = Duration::from_millis(250);
        let start = Instant::now();

        let result = with_retry(succeeds_on(3, &calls), 2, delay).await;

        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(start.elapsed(), delay);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_try_does_not_sleep() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let result = RetryPolicy::new(4, Duration::from_secs(1))
            .run(succeeds_on(1, &calls))
            .await;
        assert_eq!(result, Some("found"));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_tries_once() {
        let calls = AtomicU32::new(0);
        let result = with_retry(succeeds_on(5, &calls), 0, Duration::from_secs(1)).await;
        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::from(&RetryConfig {
            attempts: 5,
            delay_ms: 1000,
        });
        assert_eq!(policy, RetryPolicy::new(5, Duration::from_secs(1)));
    }
}
