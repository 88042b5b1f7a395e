//! Retry policy: exponential backoff with jitter.

use std::time::Duration;

/// Backoff for failed delivery attempts.
///
/// The deterministic part is `base * 2^attempt`, capped at `max_delay`.
/// On top of that, `next_delay` adds jitter drawn uniformly from
/// `[0, base)` so a burst of failures does not retry in lockstep.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub base: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(base: Duration, max_delay: Duration) -> Self {
        Self { base, max_delay }
    }

    /// The capped exponential term for the given attempt (0-indexed:
    /// attempt 0 is the delay after the first failure).
    ///
    /// Exposed separately from [`next_delay`](Self::next_delay) so callers
    /// and tests can reason about the deterministic part on its own.
    pub fn delay_without_jitter(&self, attempt: u32) -> Duration {
        // Exponent clamp keeps 2^attempt finite long before the cap applies.
        let exp = attempt.min(32);
        let secs = self.base.as_secs_f64() * 2f64.powi(exp as i32);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }

    /// Delay before the next attempt: capped exponential term plus jitter
    /// in `[0, base)`.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let jitter = self.base.mul_f64(rand::random::<f64>());
        self.delay_without_jitter(attempt) + jitter
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
        }
    }
}
