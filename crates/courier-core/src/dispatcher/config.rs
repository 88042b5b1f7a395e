//! Dispatcher configuration.
//!
//! Backoff constants, attempt caps and worker pacing are deliberately
//! configuration rather than code; deployments tune them per event mix.

use std::collections::HashMap;
use std::time::Duration;

use crate::domain::EventKind;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// How long a worker sleeps when the outbox has nothing due.
    /// Appends wake workers early, so this is an upper bound on idle latency.
    pub poll_interval: Duration,

    /// Maximum records claimed per poll.
    pub batch_size: usize,

    /// Claim lease length. A worker that does not report an outcome within
    /// this window loses the record to whichever worker polls next.
    pub claim_ttl: Duration,

    /// Per-attempt handler timeout; expiry takes the transient failure path.
    pub handler_timeout: Duration,

    pub retry: RetryPolicy,

    /// Attempt cap applied to kinds without an explicit override.
    pub max_attempts: u32,

    pub max_attempts_overrides: HashMap<EventKind, u32>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            batch_size: 16,
            claim_ttl: Duration::from_secs(30),
            handler_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            max_attempts: 5,
            max_attempts_overrides: HashMap::new(),
        }
    }
}

impl DispatcherConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_claim_ttl(mut self, ttl: Duration) -> Self {
        self.claim_ttl = ttl;
        self
    }

    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_max_attempts_for(mut self, kind: EventKind, max_attempts: u32) -> Self {
        self.max_attempts_overrides.insert(kind, max_attempts);
        self
    }

    pub fn max_attempts_for(&self, kind: EventKind) -> u32 {
        self.max_attempts_overrides
            .get(&kind)
            .copied()
            .unwrap_or(self.max_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_beat_the_default_cap() {
        let config = DispatcherConfig::default()
            .with_max_attempts(5)
            .with_max_attempts_for(EventKind::BroadcastMessage, 2);

        assert_eq!(config.max_attempts_for(EventKind::WithdrawalRequested), 5);
        assert_eq!(config.max_attempts_for(EventKind::BroadcastMessage), 2);
    }
}
