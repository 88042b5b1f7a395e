//! Ports: the seams where infrastructure plugs in.
//!
//! Each trait hides an external concern (time, id generation, persistence)
//! so the dispatcher logic stays deterministic under test and the in-memory
//! store can later be swapped for a database-backed one.

pub mod clock;
pub mod id_generator;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use id_generator::{IdGenerator, UlidGenerator};
pub use store::{ClaimedRecord, RecordStore};
