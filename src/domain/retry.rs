//! Retry timing for clip generation attempts.

use crate::error::ProviderError;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub retry: bool,
    pub delay: Duration,
}

impl RetryDecision {
    fn give_up() -> Self {
        Self {
            retry: false,
            delay: Duration::ZERO,
        }
    }
}

/// Bounded exponential backoff.
///
/// `max_retries = 2` means at most three attempts in total.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(2000),
            max_delay: Duration::from_millis(10_000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// `min(base * 2^(attempt-1), max_delay)` for a 1-based attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Decide what happens after failed attempt number `attempt` (1-based).
    pub fn should_retry(&self, attempt: u32, error: &ProviderError) -> RetryDecision {
        if attempt > self.max_retries || !error.is_retryable() {
            return RetryDecision::give_up();
        }
        RetryDecision {
            retry: true,
            delay: self.delay_for_attempt(attempt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_per_attempt() {
        let policy = RetryPolicy::new(5).with_base_delay(Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(4000));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(8000));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::new(10).with_base_delay(Duration::from_millis(3000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(10_000));
        assert_eq!(policy.delay_for_attempt(64), Duration::from_millis(10_000));
    }

    #[test]
    fn test_retries_transient_errors_until_budget_is_spent() {
        let policy = RetryPolicy::new(2);
        let err = ProviderError::retryable("502 bad gateway");

        assert!(policy.should_retry(1, &err).retry);
        assert!(policy.should_retry(2, &err).retry);
        assert_eq!(policy.should_retry(3, &err), RetryDecision::give_up());
    }

    #[test]
    fn test_final_attempt_never_retries_even_timeouts() {
        let policy = RetryPolicy::new(1);
        let timeout = ProviderError::Timeout { waited_secs: 600 };
        assert!(policy.should_retry(1, &timeout).retry);
        assert!(!policy.should_retry(2, &timeout).retry);
    }

    #[test]
    fn test_terminal_errors_are_not_retried() {
        let policy = RetryPolicy::new(2);
        let decision = policy.should_retry(1, &ProviderError::terminal("invalid image"));
        assert!(!decision.retry);
        assert_eq!(decision.delay, Duration::ZERO);
    }

    #[test]
    fn test_zero_retries_means_single_attempt() {
        let policy = RetryPolicy::new(0);
        assert!(!policy.should_retry(1, &ProviderError::retryable("503")).retry);
    }
}
