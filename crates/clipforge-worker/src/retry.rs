//! Exponential backoff policy shared by render and assembly jobs.

use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Base delay for exponential backoff (doubles each attempt).
    pub base_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Delay before the next attempt, after `failed_attempts` failures.
    pub fn delay_for_attempt(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1);
        let factor = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Backoff for another attempt, or `None` when the failure is final.
    pub fn next_delay(&self, failed_attempts: u32, retryable: bool) -> Option<Duration> {
        if retryable && failed_attempts < self.max_attempts {
            Some(self.delay_for_attempt(failed_attempts))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_and_caps() {
        let config = RetryConfig::new(10, Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(config.delay_for_attempt(5), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(64), Duration::from_secs(1));
    }

    #[test]
    fn test_next_delay_respects_budget() {
        let config = RetryConfig::new(2, Duration::from_millis(10), Duration::from_secs(1));
        assert!(config.next_delay(1, true).is_some());
        assert!(config.next_delay(2, true).is_none());
        assert!(config.next_delay(1, false).is_none());
    }
}
