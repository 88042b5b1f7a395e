//! Error types: the handler outcome taxonomy and the library error enum.

use thiserror::Error;

use super::event::EventKind;
use super::ids::RecordId;
use super::status::Status;

/// Classification of a handler failure, decided at the handler boundary.
///
/// The dispatcher maps each variant to a status transition:
/// - `Transient` schedules a retry until attempts run out, then dead-letters.
/// - `Permanent` dead-letters immediately, no retry.
/// - `Duplicate` means the side effect was already applied elsewhere and is
///   treated as success, not as a failure.
///
/// Anything a handler cannot classify should be reported as `Transient`;
/// the attempt cap turns a persistent "transient" into a dead letter.
#[derive(Debug, Clone, Error)]
pub enum HandlerError {
    #[error("transient: {0}")]
    Transient(String),

    #[error("permanent: {0}")]
    Permanent(String),

    #[error("duplicate effect: {0}")]
    Duplicate(String),
}

/// Library-level errors from the store, registry and producer API.
#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("handler already registered for event kind {0}")]
    DuplicateHandler(EventKind),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("claim token mismatch for record {0}")]
    ClaimMismatch(RecordId),

    #[error("invalid status transition for record {id}: {from} -> {to}")]
    InvalidTransition {
        id: RecordId,
        from: Status,
        to: Status,
    },

    #[error("record {0} is not dead; replay applies to dead letters only")]
    NotDead(RecordId),
}
