//! Outbox record: the single source of truth for one pending side effect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::{EventKind, EventPayload};
use super::ids::{ClaimToken, RecordId, UserId};
use super::status::Status;
use crate::idempotency::IdempotencyKey;

/// Time-bounded exclusive lease a worker holds while processing a record.
///
/// A claim whose expiry has passed is stale and may be taken over by any
/// worker; the token comparison is what keeps the old owner from applying
/// a late outcome after takeover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub token: ClaimToken,
    pub expires_at: DateTime<Utc>,
}

/// Persisted representation of one event awaiting (or done with) delivery.
///
/// Mutated only by the store on behalf of the dispatcher; never deleted.
/// Terminal records stay around for audit and reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub id: RecordId,
    pub user_id: UserId,
    pub kind: EventKind,
    pub status: Status,
    pub payload: EventPayload,

    /// Derived from the payload's business fields at append time.
    pub idempotency_key: IdempotencyKey,

    /// Delivery attempts so far, counting the in-flight one while Processing.
    pub attempts: u32,

    /// Attempt cap stamped at append time from per-kind configuration.
    pub max_attempts: u32,

    /// Present exactly while Processing.
    pub claim: Option<Claim>,

    /// Earliest time the next attempt may run; None when not awaiting retry.
    pub next_retry_at: Option<DateTime<Utc>>,

    pub last_error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OutboxRecord {
    pub fn new(
        id: RecordId,
        user_id: UserId,
        payload: EventPayload,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> Self {
        let kind = payload.kind();
        let idempotency_key = IdempotencyKey::from(&payload);
        Self {
            id,
            user_id,
            kind,
            status: Status::Pending,
            payload,
            idempotency_key,
            attempts: 0,
            max_attempts,
            claim: None,
            next_retry_at: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Is this record eligible for a claim at `now`?
    ///
    /// Pending records are due once their retry time (if any) has passed.
    /// Processing records are due again only when their claim went stale,
    /// which is the recovery path for a worker that died mid-handler.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            Status::Pending => self.next_retry_at.is_none_or(|t| t <= now),
            Status::Processing => self.claim.is_none_or(|c| c.expires_at <= now),
            Status::Completed | Status::Dead => false,
        }
    }

    pub fn claim_matches(&self, token: ClaimToken) -> bool {
        self.claim.is_some_and(|c| c.token == token)
    }

    /// Move to Processing under a fresh claim and count the attempt.
    pub fn begin_attempt(&mut self, token: ClaimToken, expires_at: DateTime<Utc>, now: DateTime<Utc>) {
        self.status = Status::Processing;
        self.attempts += 1;
        self.claim = Some(Claim { token, expires_at });
        self.next_retry_at = None;
        self.updated_at = now;
    }

    pub fn mark_completed(&mut self, now: DateTime<Utc>) {
        self.status = Status::Completed;
        self.claim = None;
        self.next_retry_at = None;
        self.updated_at = now;
    }

    /// Transient failure: back to Pending, retry no earlier than `retry_at`.
    pub fn schedule_retry(&mut self, retry_at: DateTime<Utc>, error: String, now: DateTime<Utc>) {
        self.status = Status::Pending;
        self.claim = None;
        self.next_retry_at = Some(retry_at);
        self.last_error = Some(error);
        self.updated_at = now;
    }

    pub fn mark_dead(&mut self, reason: String, now: DateTime<Utc>) {
        self.status = Status::Dead;
        self.claim = None;
        self.next_retry_at = None;
        self.last_error = Some(reason);
        self.updated_at = now;
    }

    /// Operator replay: requeue a dead letter with a reset attempt count.
    pub fn requeue_for_replay(&mut self, now: DateTime<Utc>) {
        self.status = Status::Pending;
        self.attempts = 0;
        self.claim = None;
        self.next_retry_at = None;
        self.updated_at = now;
    }
}
