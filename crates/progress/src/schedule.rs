//! Unlock schedule estimation.

use chrono::Duration;
use dripfeed_core::{Time, UnlockSnapshot};

/// Estimates when the rest of a track becomes available.
///
/// Assumes every item is completed the moment it unlocks, so the result is
/// the earliest possible time, not a prediction.
#[derive(Debug, Clone, Copy)]
pub struct UnlockEstimator {
    interval: Duration,
}

impl UnlockEstimator {
    /// Create an estimator for tracks using `interval` between unlocks.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Number of items still locked.
    pub fn remaining(&self, snapshot: &UnlockSnapshot) -> usize {
        snapshot.total_items.saturating_sub(snapshot.unlocked_count)
    }

    /// Earliest time the last item can unlock, `None` if everything is
    /// already unlocked.
    pub fn estimate_full_unlock(&self, snapshot: &UnlockSnapshot, now: Time) -> Option<Time> {
        let remaining = self.remaining(snapshot);
        if remaining == 0 {
            return None;
        }

        // Either the next unlock is already scheduled, or the frontier item
        // still has to be completed and starts the clock from now.
        let first = match snapshot.next_unlock_date {
            Some(at) => at.max(now),
            None => now.checked_add_signed(self.interval)?,
        };

        let rest = self.interval.checked_mul(i32::try_from(remaining - 1).ok()?)?;
        first.checked_add_signed(rest)
    }
}
