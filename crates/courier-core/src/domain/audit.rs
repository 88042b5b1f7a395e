//! Audit trail entries for status transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{EntryId, RecordId};
use super::status::Status;

/// One status transition of an outbox record.
///
/// Written in the same transaction as the transition itself, so the trail
/// and the record state cannot diverge. Entries are append-only and
/// immutable once written; `outbox_id` is a back-reference, not ownership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: EntryId,
    pub outbox_id: RecordId,
    pub from: Status,
    pub to: Status,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        id: EntryId,
        outbox_id: RecordId,
        from: Status,
        to: Status,
        reason: impl Into<String>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            outbox_id,
            from,
            to,
            reason: reason.into(),
            recorded_at,
        }
    }
}
