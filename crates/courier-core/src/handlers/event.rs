//! Typed event structs: one per [`EventKind`], bound by the [`Event`] trait.
//!
//! Handlers are written against these concrete types; conversion to and
//! from the stored tagged payload goes through serde, so the field sets
//! must stay in sync with [`EventPayload`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::{EventKind, EventPayload};

/// Binds a payload type to its event kind.
///
/// Bounds: serde both ways for payload conversion, `Send + Sync + 'static`
/// so handlers can be shared across worker tasks.
pub trait Event: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: EventKind;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositConfirmed {
    pub tx_ref: String,
    pub amount_minor: u64,
    pub method: String,
}

impl Event for DepositConfirmed {
    const KIND: EventKind = EventKind::DepositConfirmed;
}

impl From<DepositConfirmed> for EventPayload {
    fn from(e: DepositConfirmed) -> Self {
        EventPayload::DepositConfirmed {
            tx_ref: e.tx_ref,
            amount_minor: e.amount_minor,
            method: e.method,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalRequested {
    pub tx_ref: String,
    pub amount_minor: u64,
    pub recipient: String,
    pub method: String,
}

impl Event for WithdrawalRequested {
    const KIND: EventKind = EventKind::WithdrawalRequested;
}

impl From<WithdrawalRequested> for EventPayload {
    fn from(e: WithdrawalRequested) -> Self {
        EventPayload::WithdrawalRequested {
            tx_ref: e.tx_ref,
            amount_minor: e.amount_minor,
            recipient: e.recipient,
            method: e.method,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    pub broadcast_id: String,
    pub text: String,
}

impl Event for BroadcastMessage {
    const KIND: EventKind = EventKind::BroadcastMessage;
}

impl From<BroadcastMessage> for EventPayload {
    fn from(e: BroadcastMessage) -> Self {
        EventPayload::BroadcastMessage {
            broadcast_id: e.broadcast_id,
            text: e.text,
        }
    }
}
