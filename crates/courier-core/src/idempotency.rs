//! Idempotency keys: duplicate-effect detection across records and retries.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{EventKind, EventPayload};

/// Deterministic key identifying one logical side effect.
///
/// Derived from the event kind plus the payload's business-level reference
/// (transaction ref, broadcast id). Two records carrying the same logical
/// action map to the same key even when their record ids differ, which is
/// what lets a crash-recovery re-claim detect "already effected".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn derive(kind: EventKind, natural_key: &str) -> Self {
        Self(format!("{kind}:{natural_key}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&EventPayload> for IdempotencyKey {
    fn from(payload: &EventPayload) -> Self {
        Self::derive(payload.kind(), payload.natural_key())
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
