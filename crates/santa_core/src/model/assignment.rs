//! Giver/receiver pairs and per-scope generation status.

use serde::{Deserialize, Serialize};

/// One directed gift pair inside a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub giver: String,
    pub receiver: String,
}

impl Assignment {
    pub fn new(giver: impl Into<String>, receiver: impl Into<String>) -> Self {
        Self {
            giver: giver.into(),
            receiver: receiver.into(),
        }
    }

    /// Whether this pair maps a participant onto themself.
    pub fn is_fixed_point(&self) -> bool {
        self.giver == self.receiver
    }
}

/// Snapshot of the generation flag for one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenerationStatus {
    /// Single source of truth for whether lookups may succeed.
    pub generated: bool,
    /// Epoch milliseconds of the last successful commit.
    pub generated_at: Option<i64>,
    /// Rows currently stored for the scope.
    pub assignment_count: u32,
}
