//! Exponential backoff with jitter, shared by the Newznab client, downloader
//! adapters, and notification dispatcher so the three retry loops in the
//! spec (§4.3, §4.6, §4.7) all behave identically.

use rand::Rng;
use std::time::Duration;

/// Retry policy configuration: `initial_delay * multiplier^(attempt-1)`,
/// capped at `max_delay`, with a uniform `±jitter_factor` applied on top.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub jitter_factor: f64,
}

impl RetryPolicy {
    /// §4.3: 3 attempts, 1s → 8s, ±25% jitter.
    pub fn newznab() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
            jitter_factor: 0.25,
        }
    }

    /// §4.2: 3 attempts, factor 2, initial 1s, used for provider refresh.
    pub fn provider_refresh() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }

    /// §4.7: three retries within a 10s per-target deadline.
    pub fn notification() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(4),
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }

    /// Delay to wait before the given 1-indexed attempt. Attempt 0 means "no
    /// wait yet" and returns `Duration::ZERO`.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let mut delay = self.initial_delay.as_millis() as f64;
        if self.multiplier > 1.0 {
            delay *= self.multiplier.powi(attempt as i32 - 1);
        }
        delay = delay.min(self.max_delay.as_millis() as f64);

        if self.jitter_factor > 0.0 {
            let mut rng = rand::thread_rng();
            let jitter = rng.gen_range(-self.jitter_factor..=self.jitter_factor);
            delay *= 1.0 + jitter;
        }

        Duration::from_millis(delay.max(0.0) as u64)
    }

    pub fn should_retry(&self, attempt: u32, retryable: bool) -> bool {
        retryable && attempt < self.max_attempts
    }
}

/// Retry an async operation, calling `classify` on each error to decide
/// whether the next attempt should run. `classify` returning `false` aborts
/// immediately and returns that error.
pub async fn retry_with_policy<F, Fut, T, E>(
    policy: &RetryPolicy,
    classify: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                let retryable = classify(&error);
                if !policy.should_retry(attempt, retryable) {
                    return Err(error);
                }
                attempt += 1;
                let delay = policy.calculate_delay(attempt);
                tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, "retrying after failure");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_attempt_has_no_delay() {
        assert_eq!(RetryPolicy::newznab().calculate_delay(0), Duration::ZERO);
    }

    #[test]
    fn delay_grows_exponentially_and_is_capped() {
        let policy = RetryPolicy {
            jitter_factor: 0.0,
            ..RetryPolicy::newznab()
        };
        assert_eq!(policy.calculate_delay(1), Duration::from_secs(1));
        assert_eq!(policy.calculate_delay(2), Duration::from_secs(2));
        assert_eq!(policy.calculate_delay(3), Duration::from_secs(4));
        // would be 8s exactly at attempt 4, capped at max_delay beyond that
        assert_eq!(policy.calculate_delay(4), Duration::from_secs(8));
        assert_eq!(policy.calculate_delay(5), Duration::from_secs(8));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = RetryPolicy::newznab();
        for _ in 0..50 {
            let d = policy.calculate_delay(1).as_millis();
            assert!(d >= 750 && d <= 1250, "delay {d} out of jitter bounds");
        }
    }

    #[test]
    fn should_retry_respects_max_attempts_and_retryability() {
        let policy = RetryPolicy::newznab();
        assert!(policy.should_retry(0, true));
        assert!(policy.should_retry(2, true));
        assert!(!policy.should_retry(3, true));
        assert!(!policy.should_retry(0, false));
    }

    #[tokio::test]
    async fn retry_with_policy_stops_on_non_retryable() {
        let policy = RetryPolicy::newznab();
        let mut calls = 0;
        let result: Result<(), &str> = retry_with_policy(
            &policy,
            |_e: &&str| false,
            || {
                calls += 1;
                async { Err("fatal") }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn retry_with_policy_succeeds_eventually() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            jitter_factor: 0.0,
            ..RetryPolicy::newznab()
        };
        let mut calls = 0;
        let result: Result<i32, &str> = retry_with_policy(
            &policy,
            |_e: &&str| true,
            || {
                calls += 1;
                async move {
                    if calls < 3 {
                        Err("transient")
                    } else {
                        Ok(42)
                    }
                }
            },
        )
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls, 3);
    }
}
