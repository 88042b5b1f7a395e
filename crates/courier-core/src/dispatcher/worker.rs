//! Worker loop: poll, claim, execute, record the outcome.
//!
//! Any number of workers may run concurrently, in one process or several;
//! the only coordination between them is the store's atomic claim. A worker
//! that dies mid-handler simply lets its claim expire and another worker
//! picks the record up on a later poll.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::timeout;
use tracing::{debug, warn};

use super::config::DispatcherConfig;
use crate::domain::{HandlerError, OutboxError};
use crate::handlers::HandlerRegistry;
use crate::ports::store::ClaimedRecord;
use crate::ports::{Clock, RecordStore};

/// Handle to a group of dispatcher workers.
/// - `request_shutdown` stops the loops after their current batch.
/// - `shutdown_and_join` waits for all of them to finish.
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` workers sharing one store and handler registry.
    pub fn spawn(
        n: usize,
        store: Arc<dyn RecordStore>,
        registry: Arc<HandlerRegistry>,
        config: DispatcherConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let config = Arc::new(config);

        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let store = Arc::clone(&store);
            let registry = Arc::clone(&registry);
            let config = Arc::clone(&config);
            let clock = Arc::clone(&clock);
            let mut rx = shutdown_rx.clone();

            joins.push(tokio::spawn(async move {
                worker_loop(worker_id, store, registry, config, clock, &mut rx).await;
            }));
        }

        Self { shutdown_tx, joins }
    }

    /// Request shutdown. In-flight handler executions are not cancelled;
    /// the loops stop taking new claims.
    pub fn request_shutdown(&self) {
        // receivers may already be gone, which is fine
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for j in self.joins {
            let _ = j.await;
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    store: Arc<dyn RecordStore>,
    registry: Arc<HandlerRegistry>,
    config: Arc<DispatcherConfig>,
    clock: Arc<dyn Clock>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        match run_once(&store, &registry, &config, &clock).await {
            Ok(0) => {
                // Nothing due: sleep until an append, the poll interval, or
                // shutdown, whichever comes first.
                tokio::select! {
                    _ = shutdown_rx.changed() => {}
                    _ = store.appended() => {}
                    _ = tokio::time::sleep(config.poll_interval) => {}
                }
            }
            Ok(processed) => {
                debug!(worker_id, processed, "batch processed");
            }
            Err(e) => {
                // Store trouble: back off instead of spinning. Claims held
                // by this worker self-expire, nothing is left stuck.
                warn!(worker_id, error = %e, "poll failed, backing off");
                tokio::select! {
                    _ = shutdown_rx.changed() => {}
                    _ = tokio::time::sleep(config.poll_interval) => {}
                }
            }
        }
    }
    debug!(worker_id, "worker stopped");
}

/// One poll-claim-execute pass: claim a batch of due records and process
/// them with bounded parallelism (one task per claimed record).
///
/// Exposed so embedders and tests can step the dispatcher deterministically
/// instead of running free-spinning workers.
pub async fn run_once(
    store: &Arc<dyn RecordStore>,
    registry: &Arc<HandlerRegistry>,
    config: &Arc<DispatcherConfig>,
    clock: &Arc<dyn Clock>,
) -> Result<usize, OutboxError> {
    let batch = store.claim_due(config.batch_size, config.claim_ttl).await?;
    if batch.is_empty() {
        return Ok(0);
    }
    let claimed_count = batch.len();

    let mut set = JoinSet::new();
    for claimed in batch {
        let store = Arc::clone(store);
        let registry = Arc::clone(registry);
        let config = Arc::clone(config);
        let clock = Arc::clone(clock);
        set.spawn(async move { process_one(claimed, &store, &registry, &config, &clock).await });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "failed to record delivery outcome"),
            Err(e) => warn!(error = %e, "delivery task failed to join"),
        }
    }

    Ok(claimed_count)
}

/// Execute one claimed record and apply the classified outcome.
async fn process_one(
    claimed: ClaimedRecord,
    store: &Arc<dyn RecordStore>,
    registry: &HandlerRegistry,
    config: &DispatcherConfig,
    clock: &Arc<dyn Clock>,
) -> Result<(), OutboxError> {
    let ClaimedRecord { record, token } = claimed;

    let outcome = match registry.get(record.kind) {
        Some(handler) => {
            match timeout(config.handler_timeout, handler.deliver(&record.payload)).await {
                Ok(result) => result,
                Err(_) => Err(HandlerError::Transient(format!(
                    "handler timed out after {:?}",
                    config.handler_timeout
                ))),
            }
        }
        // Transient on purpose: another dispatcher instance may carry the
        // handler, and if none ever does the attempt cap dead-letters it.
        None => Err(HandlerError::Transient(format!(
            "no handler registered for {}",
            record.kind
        ))),
    };

    match outcome {
        Ok(()) => {
            debug!(record = %record.id, kind = %record.kind, attempt = record.attempts, "delivered");
            store.complete(record.id, token).await
        }
        Err(HandlerError::Duplicate(note)) => {
            // Already effected elsewhere; success, not failure.
            debug!(record = %record.id, kind = %record.kind, note = %note, "duplicate effect reported by handler");
            store.complete(record.id, token).await
        }
        Err(HandlerError::Permanent(reason)) => {
            warn!(record = %record.id, kind = %record.kind, reason = %reason, "permanent failure, dead-lettering");
            store.kill(record.id, token, &reason).await
        }
        Err(HandlerError::Transient(reason)) => {
            if record.attempts >= record.max_attempts {
                let note = format!(
                    "retries exhausted after {} attempts: {reason}",
                    record.attempts
                );
                warn!(record = %record.id, kind = %record.kind, attempts = record.attempts, "dead-lettering");
                store.kill(record.id, token, &note).await
            } else {
                let delay = config.retry.next_delay(record.attempts.saturating_sub(1));
                let retry_at = clock
                    .now()
                    .checked_add_signed(
                        chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::MAX),
                    )
                    .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC);
                debug!(
                    record = %record.id,
                    kind = %record.kind,
                    attempt = record.attempts,
                    delay_ms = delay.as_millis() as u64,
                    "transient failure, retry scheduled"
                );
                store.fail_attempt(record.id, token, &reason, retry_at).await
            }
        }
    }
}
