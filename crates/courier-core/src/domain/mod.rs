//! Domain model: ids, event payloads, records, statuses, audit entries,
//! and the error taxonomy.

pub mod audit;
pub mod error;
pub mod event;
pub mod ids;
pub mod record;
pub mod status;

pub use audit::AuditEntry;
pub use error::{HandlerError, OutboxError};
pub use event::{EventKind, EventPayload};
pub use ids::{ClaimToken, EntryId, RecordId, UserId};
pub use record::{Claim, OutboxRecord};
pub use status::Status;
