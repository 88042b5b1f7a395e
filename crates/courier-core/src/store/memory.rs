//! In-memory record store.
//!
//! One mutex guards records, audit trail and effect log together, so every
//! trait method is a single atomic transaction: a claim, its audit entry
//! and the idempotency check can never interleave with another worker's
//! view of the same record. Notifications are sent after the lock is
//! released.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tracing::debug;

use crate::domain::{AuditEntry, ClaimToken, OutboxError, OutboxRecord, RecordId, Status};
use crate::idempotency::IdempotencyKey;
use crate::observability::OutboxCounts;
use crate::ports::store::{ClaimedRecord, RecordStore};
use crate::ports::{Clock, IdGenerator, UlidGenerator};

struct MemoryState {
    /// Single source of truth for record state.
    records: HashMap<RecordId, OutboxRecord>,

    /// Append order, used as the claim scan order.
    arrival: Vec<RecordId>,

    /// Append-only transition history.
    audit: Vec<AuditEntry>,

    /// Idempotency keys whose side effect is known to be applied.
    effects: HashSet<IdempotencyKey>,
}

impl MemoryState {
    fn new() -> Self {
        Self {
            records: HashMap::new(),
            arrival: Vec::new(),
            audit: Vec::new(),
            effects: HashSet::new(),
        }
    }

    fn counts(&self) -> OutboxCounts {
        let mut counts = OutboxCounts::default();
        for record in self.records.values() {
            match record.status {
                Status::Pending => counts.pending += 1,
                Status::Processing => counts.processing += 1,
                Status::Completed => counts.completed += 1,
                Status::Dead => counts.dead += 1,
            }
        }
        counts
    }
}

pub struct MemoryStore {
    state: Mutex<MemoryState>,
    notify: Notify,
    clock: Arc<dyn Clock>,
    ids: UlidGenerator<Arc<dyn Clock>>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(MemoryState::new()),
            notify: Notify::new(),
            ids: UlidGenerator::new(Arc::clone(&clock)),
            clock,
        }
    }

    fn push_audit(
        &self,
        state: &mut MemoryState,
        outbox_id: RecordId,
        from: Status,
        to: Status,
        reason: String,
        now: DateTime<Utc>,
    ) {
        state
            .audit
            .push(AuditEntry::new(self.ids.entry_id(), outbox_id, from, to, reason, now));
    }

    /// Apply an outcome transition guard: the record must still be owned by
    /// the caller's claim. Rejecting here is what makes a late outcome from
    /// a reclaimed worker harmless.
    fn checked_mut<'a>(
        state: &'a mut MemoryState,
        id: RecordId,
        token: ClaimToken,
        to: Status,
    ) -> Result<&'a mut OutboxRecord, OutboxError> {
        let record = state
            .records
            .get_mut(&id)
            .ok_or(OutboxError::RecordNotFound(id))?;
        if record.status != Status::Processing {
            return Err(OutboxError::InvalidTransition {
                id,
                from: record.status,
                to,
            });
        }
        if !record.claim_matches(token) {
            return Err(OutboxError::ClaimMismatch(id));
        }
        Ok(record)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn append(&self, record: OutboxRecord) -> Result<RecordId, OutboxError> {
        record.payload.validate()?;
        let id = record.id;
        {
            let mut state = self.state.lock().await;
            state.records.insert(id, record);
            state.arrival.push(id);
        }
        self.notify.notify_one();
        Ok(id)
    }

    async fn claim_due(
        &self,
        limit: usize,
        claim_ttl: Duration,
    ) -> Result<Vec<ClaimedRecord>, OutboxError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let ttl = chrono::Duration::from_std(claim_ttl).unwrap_or(chrono::Duration::MAX);
        let mut out = Vec::new();

        let mut state = self.state.lock().await;
        let now = self.clock.now();
        let scan: Vec<RecordId> = state.arrival.clone();

        // Keys whose side effect may be executing right now: records held
        // under a live claim, plus whatever this call claims. A twin with
        // a busy key stays pending until an outcome lands, at which point
        // the effect log (or a retry) settles what happens to it.
        let mut busy_keys: HashSet<IdempotencyKey> = state
            .records
            .values()
            .filter(|r| r.status == Status::Processing && !r.is_due(now))
            .map(|r| r.idempotency_key.clone())
            .collect();

        for id in scan {
            let Some(record) = state.records.get(&id) else {
                continue;
            };
            if !record.is_due(now) {
                continue;
            }
            let from = record.status;

            // Idempotency check folded into the claim: a record whose effect
            // is already logged completes in place and is never handed out.
            if state.effects.contains(&record.idempotency_key) {
                let key = record.idempotency_key.clone();
                if let Some(record) = state.records.get_mut(&id) {
                    record.mark_completed(now);
                }
                debug!(record = %id, key = %key, "duplicate delivery short-circuited");
                self.push_audit(
                    &mut state,
                    id,
                    from,
                    Status::Completed,
                    format!("duplicate delivery short-circuited (key {key})"),
                    now,
                );
                continue;
            }

            if !busy_keys.insert(record.idempotency_key.clone()) {
                continue;
            }

            let token = self.ids.claim_token();
            let expires_at = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
            let Some(record) = state.records.get_mut(&id) else {
                continue;
            };
            record.begin_attempt(token, expires_at, now);
            let attempt = record.attempts;
            let claimed = record.clone();

            let reason = if from == Status::Processing {
                format!("reclaimed expired claim (attempt {attempt})")
            } else {
                format!("claimed for delivery (attempt {attempt})")
            };
            self.push_audit(&mut state, id, from, Status::Processing, reason, now);

            out.push(ClaimedRecord {
                record: claimed,
                token,
            });
            if out.len() == limit {
                break;
            }
        }

        Ok(out)
    }

    async fn complete(&self, id: RecordId, token: ClaimToken) -> Result<(), OutboxError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();

        let record = Self::checked_mut(&mut state, id, token, Status::Completed)?;
        let key = record.idempotency_key.clone();
        record.mark_completed(now);

        // Effect log write and status update are one transaction.
        state.effects.insert(key);
        self.push_audit(
            &mut state,
            id,
            Status::Processing,
            Status::Completed,
            "handler effect applied".to_string(),
            now,
        );
        Ok(())
    }

    async fn fail_attempt(
        &self,
        id: RecordId,
        token: ClaimToken,
        error: &str,
        retry_at: DateTime<Utc>,
    ) -> Result<(), OutboxError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();

        let record = Self::checked_mut(&mut state, id, token, Status::Pending)?;
        record.schedule_retry(retry_at, error.to_string(), now);
        self.push_audit(
            &mut state,
            id,
            Status::Processing,
            Status::Pending,
            format!("transient failure, retry at {retry_at}: {error}"),
            now,
        );
        Ok(())
    }

    async fn kill(
        &self,
        id: RecordId,
        token: ClaimToken,
        reason: &str,
    ) -> Result<(), OutboxError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();

        let record = Self::checked_mut(&mut state, id, token, Status::Dead)?;
        record.mark_dead(reason.to_string(), now);
        self.push_audit(
            &mut state,
            id,
            Status::Processing,
            Status::Dead,
            format!("dead-lettered: {reason}"),
            now,
        );
        Ok(())
    }

    async fn get(&self, id: RecordId) -> Result<OutboxRecord, OutboxError> {
        let state = self.state.lock().await;
        state
            .records
            .get(&id)
            .cloned()
            .ok_or(OutboxError::RecordNotFound(id))
    }

    async fn dead_letters(&self) -> Result<Vec<OutboxRecord>, OutboxError> {
        let state = self.state.lock().await;
        Ok(state
            .arrival
            .iter()
            .filter_map(|id| state.records.get(id))
            .filter(|r| r.status == Status::Dead)
            .cloned()
            .collect())
    }

    async fn replay(&self, id: RecordId) -> Result<(), OutboxError> {
        {
            let mut state = self.state.lock().await;
            let now = self.clock.now();

            let record = state
                .records
                .get_mut(&id)
                .ok_or(OutboxError::RecordNotFound(id))?;
            if record.status != Status::Dead {
                return Err(OutboxError::NotDead(id));
            }
            record.requeue_for_replay(now);
            self.push_audit(
                &mut state,
                id,
                Status::Dead,
                Status::Pending,
                "operator replay".to_string(),
                now,
            );
        }
        self.notify.notify_one();
        Ok(())
    }

    async fn history(&self, id: RecordId) -> Result<Vec<AuditEntry>, OutboxError> {
        let state = self.state.lock().await;
        if !state.records.contains_key(&id) {
            return Err(OutboxError::RecordNotFound(id));
        }
        Ok(state
            .audit
            .iter()
            .filter(|e| e.outbox_id == id)
            .cloned()
            .collect())
    }

    async fn counts(&self) -> Result<OutboxCounts, OutboxError> {
        let state = self.state.lock().await;
        Ok(state.counts())
    }

    async fn appended(&self) {
        self.notify.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventPayload, UserId};
    use crate::ports::ManualClock;
    use chrono::TimeZone;
    use ulid::Ulid;

    const TTL: Duration = Duration::from_secs(30);

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    fn setup() -> (Arc<ManualClock>, MemoryStore) {
        let clock = Arc::new(ManualClock::new(t0()));
        let store = MemoryStore::new(clock.clone());
        (clock, store)
    }

    fn withdrawal(tx_ref: &str) -> OutboxRecord {
        OutboxRecord::new(
            RecordId::from_ulid(Ulid::new()),
            UserId::from_ulid(Ulid::new()),
            EventPayload::WithdrawalRequested {
                tx_ref: tx_ref.to_string(),
                amount_minor: 100,
                recipient: "acct-1".to_string(),
                method: "sepa".to_string(),
            },
            5,
            t0(),
        )
    }

    #[tokio::test]
    async fn append_then_claim() {
        let (_clock, store) = setup();
        let id = store.append(withdrawal("tx-1")).await.unwrap();

        let batch = store.claim_due(10, TTL).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].record.id, id);
        assert_eq!(batch[0].record.status, Status::Processing);
        assert_eq!(batch[0].record.attempts, 1);

        let history = store.history(id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from, Status::Pending);
        assert_eq!(history[0].to, Status::Processing);

        let counts = store.counts().await.unwrap();
        assert_eq!(counts.processing, 1);
        assert_eq!(counts.pending, 0);
    }

    #[tokio::test]
    async fn invalid_payload_is_rejected_at_append() {
        let (_clock, store) = setup();
        let mut record = withdrawal("tx-1");
        record.payload = EventPayload::DepositConfirmed {
            tx_ref: "tx-1".to_string(),
            amount_minor: 0,
            method: "card".to_string(),
        };
        assert!(matches!(
            store.append(record).await,
            Err(OutboxError::InvalidPayload(_))
        ));
    }

    #[tokio::test]
    async fn claimed_record_is_not_claimable_again_within_ttl() {
        let (_clock, store) = setup();
        store.append(withdrawal("tx-1")).await.unwrap();

        let first = store.claim_due(10, TTL).await.unwrap();
        assert_eq!(first.len(), 1);
        let second = store.claim_due(10, TTL).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn retry_time_gates_the_next_claim() {
        let (clock, store) = setup();
        let id = store.append(withdrawal("tx-1")).await.unwrap();

        let claimed = store.claim_due(10, TTL).await.unwrap().remove(0);
        let retry_at = clock.now() + chrono::Duration::seconds(10);
        store
            .fail_attempt(id, claimed.token, "io timeout", retry_at)
            .await
            .unwrap();

        assert!(store.claim_due(10, TTL).await.unwrap().is_empty());

        clock.advance(Duration::from_secs(10));
        let again = store.claim_due(10, TTL).await.unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].record.attempts, 2);
    }

    #[tokio::test]
    async fn complete_records_effect_and_audit() {
        let (_clock, store) = setup();
        let id = store.append(withdrawal("tx-1")).await.unwrap();
        let claimed = store.claim_due(10, TTL).await.unwrap().remove(0);

        store.complete(id, claimed.token).await.unwrap();

        let record = store.get(id).await.unwrap();
        assert_eq!(record.status, Status::Completed);
        assert!(record.claim.is_none());

        let history = store.history(id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].from, Status::Processing);
        assert_eq!(history[1].to, Status::Completed);
    }

    #[tokio::test]
    async fn wrong_token_is_rejected() {
        let (_clock, store) = setup();
        let id = store.append(withdrawal("tx-1")).await.unwrap();
        let _claimed = store.claim_due(10, TTL).await.unwrap().remove(0);

        let stranger = ClaimToken::from_ulid(Ulid::new());
        assert!(matches!(
            store.complete(id, stranger).await,
            Err(OutboxError::ClaimMismatch(_))
        ));
        assert!(matches!(
            store.kill(id, stranger, "nope").await,
            Err(OutboxError::ClaimMismatch(_))
        ));
    }

    #[tokio::test]
    async fn outcome_without_claim_is_an_invalid_transition() {
        let (_clock, store) = setup();
        let id = store.append(withdrawal("tx-1")).await.unwrap();

        let token = ClaimToken::from_ulid(Ulid::new());
        assert!(matches!(
            store.complete(id, token).await,
            Err(OutboxError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn stale_claim_is_reclaimable_and_the_old_owner_loses() {
        let (clock, store) = setup();
        let id = store.append(withdrawal("tx-1")).await.unwrap();

        let old = store.claim_due(10, TTL).await.unwrap().remove(0);

        // Worker dies mid-handler; its claim expires.
        clock.advance(TTL + Duration::from_secs(1));

        let new = store.claim_due(10, TTL).await.unwrap().remove(0);
        assert_eq!(new.record.id, id);
        assert_eq!(new.record.attempts, 2);
        assert_ne!(new.token, old.token);

        // The late outcome from the dead worker must not apply.
        assert!(matches!(
            store.complete(id, old.token).await,
            Err(OutboxError::ClaimMismatch(_))
        ));
        store.complete(id, new.token).await.unwrap();

        let history = store.history(id).await.unwrap();
        assert!(history.iter().any(|e| e.reason.contains("reclaimed")));
    }

    #[tokio::test]
    async fn duplicate_key_short_circuits_at_claim() {
        let (_clock, store) = setup();
        // Producer retry: two records, same business reference.
        let first = store.append(withdrawal("tx-1")).await.unwrap();
        let second = store.append(withdrawal("tx-1")).await.unwrap();

        let claimed = store.claim_due(1, TTL).await.unwrap().remove(0);
        assert_eq!(claimed.record.id, first);
        store.complete(first, claimed.token).await.unwrap();

        // The duplicate is completed in place and never handed out.
        assert!(store.claim_due(10, TTL).await.unwrap().is_empty());

        let twin = store.get(second).await.unwrap();
        assert_eq!(twin.status, Status::Completed);
        let history = store.history(second).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].reason.contains("duplicate"));
    }

    #[tokio::test]
    async fn in_flight_key_blocks_the_twin_until_an_outcome() {
        let (_clock, store) = setup();
        let first = store.append(withdrawal("tx-1")).await.unwrap();
        let claimed = store.claim_due(10, TTL).await.unwrap().remove(0);
        assert_eq!(claimed.record.id, first);

        // Producer retry lands while the first record is still being
        // handled under a live claim. The twin must not be handed out,
        // or two workers run the same side effect concurrently.
        let second = store.append(withdrawal("tx-1")).await.unwrap();
        assert!(store.claim_due(10, TTL).await.unwrap().is_empty());
        assert_eq!(store.get(second).await.unwrap().status, Status::Pending);

        store.complete(first, claimed.token).await.unwrap();

        // With the effect on record, the twin completes without delivery.
        assert!(store.claim_due(10, TTL).await.unwrap().is_empty());
        assert_eq!(store.get(second).await.unwrap().status, Status::Completed);
    }

    #[tokio::test]
    async fn in_flight_key_is_released_by_a_transient_failure() {
        let (_clock, store) = setup();
        let first = store.append(withdrawal("tx-1")).await.unwrap();
        let claimed = store.claim_due(10, TTL).await.unwrap().remove(0);
        let second = store.append(withdrawal("tx-1")).await.unwrap();

        store
            .fail_attempt(first, claimed.token, "io timeout", t0())
            .await
            .unwrap();

        // Both records carry the key now; exactly one may go out.
        let batch = store.claim_due(10, TTL).await.unwrap();
        assert_eq!(batch.len(), 1);
        let other = if batch[0].record.id == first { second } else { first };
        assert_eq!(store.get(other).await.unwrap().status, Status::Pending);
    }

    #[tokio::test]
    async fn replay_requeues_a_dead_letter() {
        let (_clock, store) = setup();
        let id = store.append(withdrawal("tx-1")).await.unwrap();
        let claimed = store.claim_due(10, TTL).await.unwrap().remove(0);
        store
            .kill(id, claimed.token, "invalid recipient")
            .await
            .unwrap();

        let dead = store.dead_letters().await.unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].last_error.as_deref(), Some("invalid recipient"));

        store.replay(id).await.unwrap();
        let record = store.get(id).await.unwrap();
        assert_eq!(record.status, Status::Pending);
        assert_eq!(record.attempts, 0);

        // Replays only apply to dead letters.
        let again = store.claim_due(10, TTL).await.unwrap().remove(0);
        store.complete(id, again.token).await.unwrap();
        assert!(matches!(
            store.replay(id).await,
            Err(OutboxError::NotDead(_))
        ));
    }

    #[tokio::test]
    async fn history_is_scoped_to_one_record() {
        let (_clock, store) = setup();
        let a = store.append(withdrawal("tx-a")).await.unwrap();
        let b = store.append(withdrawal("tx-b")).await.unwrap();

        let batch = store.claim_due(10, TTL).await.unwrap();
        for claimed in batch {
            store.complete(claimed.record.id, claimed.token).await.unwrap();
        }

        let history_a = store.history(a).await.unwrap();
        assert_eq!(history_a.len(), 2);
        assert!(history_a.iter().all(|e| e.outbox_id == a));
        assert_eq!(store.history(b).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn append_wakes_a_waiting_worker() {
        let (_clock, store) = setup();
        store.append(withdrawal("tx-1")).await.unwrap();

        // The stored permit from the append resolves immediately.
        tokio::time::timeout(Duration::from_millis(50), store.appended())
            .await
            .expect("append notification should be pending");
    }
}
