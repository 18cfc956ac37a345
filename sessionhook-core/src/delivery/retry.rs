//! Retry policy for failed deliveries with exponential backoff

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Decides whether and when a failed delivery is attempted again
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: bool,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay,
            max_delay: config.max_delay,
            jitter: config.jitter,
        }
    }

    /// Single attempt, never retry
    pub fn no_retry() -> Self {
        Self::new(&RetryConfig::default())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the attempt following the failed `attempt`
    ///
    /// Returns `None` if `attempt` was the last one allowed.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }

        let delay = self.backoff(attempt);
        if self.jitter && !delay.is_zero() {
            let half = delay / 2;
            let spread = rand::thread_rng().gen_range(0..=half.as_millis() as u64);
            Some(half + Duration::from_millis(spread))
        } else {
            Some(delay)
        }
    }

    /// `base_delay * 2^(attempt - 1)`, capped at `max_delay`
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::no_retry()
    }
}
