//! Status views for operational inspection.

use serde::{Deserialize, Serialize};

/// Record counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxCounts {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub dead: usize,
}
