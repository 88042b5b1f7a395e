//! Store implementations of the [`RecordStore`](crate::ports::RecordStore)
//! port.

pub mod memory;

pub use memory::MemoryStore;
