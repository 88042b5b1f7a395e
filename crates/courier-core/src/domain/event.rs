//! Event kinds and their payload schemas.
//!
//! Payloads are a tagged union keyed by the event kind, one schema per kind,
//! validated when a producer appends the record. Handlers receive the typed
//! variant data, never raw JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::OutboxError;

/// Enumerated event kind, used to route records to handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    DepositConfirmed,
    WithdrawalRequested,
    BroadcastMessage,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::DepositConfirmed => "deposit-confirmed",
            EventKind::WithdrawalRequested => "withdrawal-requested",
            EventKind::BroadcastMessage => "broadcast-message",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured payload, tagged by kind.
///
/// Amounts are minor units (cents) to avoid floating point money.
/// `tx_ref` / `broadcast_id` are the business-level references that the
/// idempotency key is derived from, so they must be stable across producer
/// retries of the same logical action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EventPayload {
    DepositConfirmed {
        tx_ref: String,
        amount_minor: u64,
        method: String,
    },
    WithdrawalRequested {
        tx_ref: String,
        amount_minor: u64,
        recipient: String,
        method: String,
    },
    BroadcastMessage {
        broadcast_id: String,
        text: String,
    },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::DepositConfirmed { .. } => EventKind::DepositConfirmed,
            EventPayload::WithdrawalRequested { .. } => EventKind::WithdrawalRequested,
            EventPayload::BroadcastMessage { .. } => EventKind::BroadcastMessage,
        }
    }

    /// Business-meaning key for duplicate detection.
    ///
    /// Deliberately not the record id: a producer retry creates a new record
    /// for the same logical action, and it must map to the same key.
    pub fn natural_key(&self) -> &str {
        match self {
            EventPayload::DepositConfirmed { tx_ref, .. } => tx_ref,
            EventPayload::WithdrawalRequested { tx_ref, .. } => tx_ref,
            EventPayload::BroadcastMessage { broadcast_id, .. } => broadcast_id,
        }
    }

    /// Append-time validation. A payload that fails here never reaches the
    /// outbox, so handlers can rely on these invariants.
    pub fn validate(&self) -> Result<(), OutboxError> {
        match self {
            EventPayload::DepositConfirmed {
                tx_ref,
                amount_minor,
                method,
            } => {
                require_non_empty("tx_ref", tx_ref)?;
                require_non_empty("method", method)?;
                require_positive_amount(*amount_minor)
            }
            EventPayload::WithdrawalRequested {
                tx_ref,
                amount_minor,
                recipient,
                method,
            } => {
                require_non_empty("tx_ref", tx_ref)?;
                require_non_empty("recipient", recipient)?;
                require_non_empty("method", method)?;
                require_positive_amount(*amount_minor)
            }
            EventPayload::BroadcastMessage { broadcast_id, text } => {
                require_non_empty("broadcast_id", broadcast_id)?;
                require_non_empty("text", text)
            }
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), OutboxError> {
    if value.trim().is_empty() {
        return Err(OutboxError::InvalidPayload(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

fn require_positive_amount(amount_minor: u64) -> Result<(), OutboxError> {
    if amount_minor == 0 {
        return Err(OutboxError::InvalidPayload(
            "amount_minor must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_with_kebab_case_tag() {
        let p = EventPayload::WithdrawalRequested {
            tx_ref: "tx-42".to_string(),
            amount_minor: 100,
            recipient: "acct-9".to_string(),
            method: "sepa".to_string(),
        };

        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["type"], "withdrawal-requested");
        assert_eq!(v["amount_minor"], 100);

        let back: EventPayload = serde_json::from_value(v).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn kind_matches_variant() {
        let p = EventPayload::BroadcastMessage {
            broadcast_id: "b-1".to_string(),
            text: "hello".to_string(),
        };
        assert_eq!(p.kind(), EventKind::BroadcastMessage);
        assert_eq!(p.kind().as_str(), "broadcast-message");
    }

    #[test]
    fn natural_key_comes_from_business_fields() {
        let p = EventPayload::DepositConfirmed {
            tx_ref: "tx-7".to_string(),
            amount_minor: 500,
            method: "card".to_string(),
        };
        assert_eq!(p.natural_key(), "tx-7");
    }

    #[test]
    fn zero_amount_is_rejected() {
        let p = EventPayload::DepositConfirmed {
            tx_ref: "tx-7".to_string(),
            amount_minor: 0,
            method: "card".to_string(),
        };
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("amount_minor"));
    }

    #[test]
    fn blank_tx_ref_is_rejected() {
        let p = EventPayload::WithdrawalRequested {
            tx_ref: "  ".to_string(),
            amount_minor: 100,
            recipient: "acct".to_string(),
            method: "sepa".to_string(),
        };
        assert!(p.validate().is_err());
    }
}
