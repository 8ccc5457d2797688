//! Progress events - "state changed" notifications.

use serde::{Deserialize, Serialize};
use crate::id::EventId;
use crate::snapshot::UnlockSnapshot;
use crate::Time;

/// Emitted once per call that changed a track's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Unique identifier
    pub id: EventId,

    /// The `now` of the call that produced the change
    pub timestamp: Time,

    /// What changed
    pub kind: ChangeKind,

    /// Progress after the change
    pub snapshot: UnlockSnapshot,
}

impl ProgressEvent {
    /// Create a new event.
    pub fn new(kind: ChangeKind, timestamp: Time, snapshot: UnlockSnapshot) -> Self {
        Self {
            id: EventId::new(),
            timestamp,
            kind,
            snapshot,
        }
    }
}

/// Cause of a state change.
///
/// When one call changes several things the most significant cause wins:
/// `Completed` over `Unlocked` over `Sanitized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// The unlock interval elapsed and the next item unlocked
    Unlocked,
    /// A completion was recorded
    Completed,
    /// State was clamped to a new item count
    Sanitized,
    /// Progress was reset to the initial state
    Reset,
}

impl ChangeKind {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Unlocked => "unlocked",
            ChangeKind::Completed => "completed",
            ChangeKind::Sanitized => "sanitized",
            ChangeKind::Reset => "reset",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
