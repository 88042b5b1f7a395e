//! RecordStore port: the single point of shared mutable state.
//!
//! All coordination between dispatcher workers reduces to atomic
//! conditional updates against this store. There is no separate lock
//! manager; the claim token is the ownership proof.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::{AuditEntry, ClaimToken, OutboxError, OutboxRecord, RecordId};
use crate::observability::OutboxCounts;

/// A record handed to a worker together with its claim token.
///
/// The token must accompany every outcome call; a stale owner whose claim
/// was reclaimed by another worker fails the token comparison instead of
/// clobbering the newer attempt.
#[derive(Debug, Clone)]
pub struct ClaimedRecord {
    pub record: OutboxRecord,
    pub token: ClaimToken,
}

/// Source of truth for outbox records, their audit trail, and the
/// effect log used for duplicate detection.
///
/// Contract for implementations:
/// - Each method is one atomic transaction. Claim, outcome application and
///   the matching audit write never interleave with another worker's view.
/// - `claim_due` must not double-claim: a record is returned to exactly one
///   caller until its claim expires or is released by an outcome call.
/// - The idempotency check happens inside `claim_due`, not before it, so
///   there is no check-then-claim race: a record whose key is already in
///   the effect log is completed in place and never handed out.
/// - Outcome methods (`complete`, `fail_attempt`, `kill`) verify status and
///   claim token and reject anything else.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a new record. Payload validation has already happened at the
    /// producer boundary; implementations may re-check invariants they need.
    async fn append(&self, record: OutboxRecord) -> Result<RecordId, OutboxError>;

    /// Claim up to `limit` due records, marking each Processing under a
    /// fresh claim token that expires after `claim_ttl`. Records whose
    /// previous claim went stale are due again and may be reclaimed here.
    async fn claim_due(
        &self,
        limit: usize,
        claim_ttl: Duration,
    ) -> Result<Vec<ClaimedRecord>, OutboxError>;

    /// Record success: mark Completed and add the record's idempotency key
    /// to the effect log, atomically.
    async fn complete(&self, id: RecordId, token: ClaimToken) -> Result<(), OutboxError>;

    /// Record a transient failure: back to Pending with the given retry time.
    async fn fail_attempt(
        &self,
        id: RecordId,
        token: ClaimToken,
        error: &str,
        retry_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), OutboxError>;

    /// Dead-letter the record. Requires operator action to ever run again.
    async fn kill(&self, id: RecordId, token: ClaimToken, reason: &str)
    -> Result<(), OutboxError>;

    async fn get(&self, id: RecordId) -> Result<OutboxRecord, OutboxError>;

    /// All dead records, for manual reconciliation.
    async fn dead_letters(&self) -> Result<Vec<OutboxRecord>, OutboxError>;

    /// Operator action: requeue a dead record as Pending with a reset
    /// attempt count. Never triggered automatically.
    async fn replay(&self, id: RecordId) -> Result<(), OutboxError>;

    /// Ordered transition history of one record.
    async fn history(&self, id: RecordId) -> Result<Vec<AuditEntry>, OutboxError>;

    async fn counts(&self) -> Result<OutboxCounts, OutboxError>;

    /// Resolves when a producer appends a record; lets workers wake early
    /// instead of waiting out the poll interval.
    async fn appended(&self);
}
