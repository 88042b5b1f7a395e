//! Wiring: build a [`Courier`] from handlers, config, clock and store.
//!
//! The builder is fail-fast: `expect_kinds` declares the event kinds a
//! deployment must be able to deliver, and `build` refuses to produce a
//! courier missing any of them. A missing handler discovered at startup is
//! a config error; discovered at delivery time it is a stuck record.

use std::sync::Arc;

use crate::domain::{
    AuditEntry, EventKind, EventPayload, OutboxError, OutboxRecord, RecordId, UserId,
};
use crate::handlers::{Event, Handler, HandlerRegistry};
use crate::observability::OutboxCounts;
use crate::ports::{Clock, IdGenerator, RecordStore, SystemClock, UlidGenerator};
use crate::store::MemoryStore;

use super::config::DispatcherConfig;
use super::worker::WorkerGroup;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing handlers for event kinds {0:?}; these kinds were expected but not registered")]
    MissingHandlers(Vec<EventKind>),

    #[error(transparent)]
    Registry(#[from] OutboxError),
}

pub struct CourierBuilder {
    registry: HandlerRegistry,
    expected_kinds: Option<Vec<EventKind>>,
    config: DispatcherConfig,
    clock: Option<Arc<dyn Clock>>,
    store: Option<Arc<dyn RecordStore>>,
}

impl CourierBuilder {
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            expected_kinds: None,
            config: DispatcherConfig::default(),
            clock: None,
            store: None,
        }
    }

    /// Register the handler for `E`'s kind. Double registration is an error.
    pub fn register<E: Event, H: Handler<E> + 'static>(
        mut self,
        handler: H,
    ) -> Result<Self, BuildError> {
        self.registry.register::<E, H>(handler)?;
        Ok(self)
    }

    /// Declare the kinds this deployment must handle; `build` fails if any
    /// of them lacks a registered handler.
    pub fn expect_kinds(mut self, kinds: &[EventKind]) -> Self {
        self.expected_kinds = Some(kinds.to_vec());
        self
    }

    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Validate and wire everything up. Defaults: system clock, in-memory
    /// store.
    pub fn build(self) -> Result<Courier, BuildError> {
        if let Some(expected) = &self.expected_kinds {
            let registered = self.registry.registered_kinds();
            let missing: Vec<EventKind> = expected
                .iter()
                .filter(|k| !registered.contains(k))
                .copied()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingHandlers(missing));
            }
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new(Arc::clone(&clock))));

        Ok(Courier {
            ids: UlidGenerator::new(Arc::clone(&clock)),
            store,
            registry: Arc::new(self.registry),
            config: self.config,
            clock,
        })
    }
}

impl Default for CourierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The assembled outbox: producer API, worker management and the operator
/// surface, all over one shared store.
pub struct Courier {
    ids: UlidGenerator<Arc<dyn Clock>>,
    store: Arc<dyn RecordStore>,
    registry: Arc<HandlerRegistry>,
    config: DispatcherConfig,
    clock: Arc<dyn Clock>,
}

impl Courier {
    /// Producer entry point: validate the payload and durably append a
    /// pending record. Returns the record id for later inspection.
    ///
    /// This is the only write a producer makes; delivery happens later,
    /// on a worker.
    pub async fn append_event(
        &self,
        user_id: UserId,
        event: impl Into<EventPayload>,
    ) -> Result<RecordId, OutboxError> {
        let payload = event.into();
        payload.validate()?;
        let max_attempts = self.config.max_attempts_for(payload.kind());
        let record = OutboxRecord::new(
            self.ids.record_id(),
            user_id,
            payload,
            max_attempts,
            self.clock.now(),
        );
        self.store.append(record).await
    }

    /// Spawn `n` delivery workers sharing this courier's store and handlers.
    pub fn spawn_workers(&self, n: usize) -> WorkerGroup {
        WorkerGroup::spawn(
            n,
            Arc::clone(&self.store),
            Arc::clone(&self.registry),
            self.config.clone(),
            Arc::clone(&self.clock),
        )
    }

    pub async fn get(&self, id: RecordId) -> Result<OutboxRecord, OutboxError> {
        self.store.get(id).await
    }

    /// Dead letters awaiting operator attention.
    pub async fn dead_letters(&self) -> Result<Vec<OutboxRecord>, OutboxError> {
        self.store.dead_letters().await
    }

    /// Requeue a dead letter for a fresh round of attempts.
    pub async fn replay(&self, id: RecordId) -> Result<(), OutboxError> {
        self.store.replay(id).await
    }

    /// Audit trail for one record, oldest first.
    pub async fn history(&self, id: RecordId) -> Result<Vec<AuditEntry>, OutboxError> {
        self.store.history(id).await
    }

    pub async fn counts(&self) -> Result<OutboxCounts, OutboxError> {
        self.store.counts().await
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }
}
