//! courier-core
//!
//! Durable outbox dispatcher: append business events to a durable record
//! store, deliver each to its side-effect handler at least once, retry
//! transient failures with capped exponential backoff, and dead-letter
//! what keeps failing — with an append-only audit trail per record.
//!
//! # Module map
//! - **domain**: ids, event payloads, the outbox record state machine,
//!   audit entries, the error taxonomy
//! - **ports**: the seams (Clock, IdGenerator, RecordStore)
//! - **handlers**: typed event structs, the `Handler` trait, the registry
//! - **retry**: exponential backoff with jitter
//! - **idempotency**: keys derived from business references
//! - **store**: in-memory `RecordStore` implementation
//! - **dispatcher**: configuration, worker loops, the [`Courier`] facade
//! - **observability**: status count views

pub mod dispatcher;
pub mod domain;
pub mod handlers;
pub mod idempotency;
pub mod observability;
pub mod ports;
pub mod retry;
pub mod store;

pub use dispatcher::{BuildError, Courier, CourierBuilder, DispatcherConfig, WorkerGroup};
pub use domain::{
    AuditEntry, EventKind, EventPayload, HandlerError, OutboxError, OutboxRecord, RecordId,
    Status, UserId,
};
pub use handlers::{BroadcastMessage, DepositConfirmed, Event, Handler, WithdrawalRequested};
pub use idempotency::IdempotencyKey;
pub use observability::OutboxCounts;
pub use ports::{Clock, ManualClock, RecordStore, SystemClock};
pub use retry::RetryPolicy;
pub use store::MemoryStore;
