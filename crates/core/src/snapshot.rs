//! Read-only projections of unlock progress.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use crate::state::UnlockState;
use crate::Time;

/// Snapshot of a track's progress at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockSnapshot {
    /// Item count the snapshot was computed for
    pub total_items: usize,

    /// Number of unlocked items
    pub unlocked_count: usize,

    /// Index of the last completed item
    pub last_completed_index: Option<usize>,

    /// When the last completed item was completed
    pub last_completion_date: Option<Time>,

    /// When the next item unlocks (None if nothing is pending)
    pub next_unlock_date: Option<Time>,
}

impl UnlockSnapshot {
    /// Project a (sanitized) state for `total_items`.
    pub fn from_state(state: &UnlockState, total_items: usize, interval: Duration) -> Self {
        Self {
            total_items,
            unlocked_count: state.unlocked_count,
            last_completed_index: state.last_completed_index(),
            last_completion_date: state.last_completion_date(),
            next_unlock_date: state.next_unlock_date(total_items, interval),
        }
    }

    /// State of the item at `index`.
    pub fn item_state(&self, index: usize) -> ItemState {
        if self.last_completed_index.is_some_and(|last| index <= last) {
            ItemState::Completed
        } else if index < self.unlocked_count {
            ItemState::Unlocked
        } else {
            ItemState::Locked
        }
    }

    /// Whether the item at `index` can be opened.
    pub fn is_unlocked(&self, index: usize) -> bool {
        index < self.unlocked_count
    }

    /// Whether the item at `index` lies at or behind the completion frontier.
    pub fn is_completed(&self, index: usize) -> bool {
        self.item_state(index) == ItemState::Completed
    }

    /// Whether every item has been unlocked.
    pub fn is_exhausted(&self) -> bool {
        self.unlocked_count >= self.total_items
    }

    /// Time left until the next unlock, zero if it is already due.
    pub fn time_until_next_unlock(&self, now: Time) -> Option<Duration> {
        self.next_unlock_date
            .map(|at| at.signed_duration_since(now).max(Duration::zero()))
    }

    /// Per-item states for the whole track.
    pub fn items(&self) -> Vec<ItemState> {
        (0..self.total_items).map(|i| self.item_state(i)).collect()
    }
}

/// Per-item view of the unlock state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemState {
    /// Not yet available
    Locked,
    /// Available but not completed
    Unlocked,
    /// Completed (at or behind the completion frontier)
    Completed,
}

impl ItemState {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::Locked => "locked",
            ItemState::Unlocked => "unlocked",
            ItemState::Completed => "completed",
        }
    }
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
