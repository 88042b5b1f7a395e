//! Record status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery status of an outbox record.
///
/// Transitions are monotonic along:
/// - Pending -> Processing -> Completed
/// - Pending -> Processing -> Pending (transient failure, retry scheduled)
/// - Pending -> Processing -> Dead (permanent failure or retries exhausted)
///
/// Terminal records never re-enter Pending, with one explicit exception:
/// an operator `replay` of a Dead record, which is a manual action and is
/// recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Waiting to be claimed (possibly not before `next_retry_at`).
    Pending,

    /// Claimed by a worker; the claim carries a token and an expiry.
    Processing,

    /// Side effect applied, never touched again.
    Completed,

    /// Retries exhausted or non-retryable failure; needs operator action.
    Dead,
}

impl Status {
    /// Terminal states are retained for audit and reconciliation and are
    /// never deleted or rescheduled automatically.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Completed | Status::Dead)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Pending => "pending",
            Status::Processing => "processing",
            Status::Completed => "completed",
            Status::Dead => "dead",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completed_and_dead_are_terminal() {
        assert!(!Status::Pending.is_terminal());
        assert!(!Status::Processing.is_terminal());
        assert!(Status::Completed.is_terminal());
        assert!(Status::Dead.is_terminal());
    }

    #[test]
    fn status_serializes_lowercase() {
        let s = serde_json::to_string(&Status::Processing).unwrap();
        assert_eq!(s, "\"processing\"");
    }
}
