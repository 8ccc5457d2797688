//! Unlock state - the progress record of one sequential track.
//!
//! The state only ever moves forward in time: the unlock frontier grows when
//! the unlock interval has elapsed since the last completion, and it is
//! clamped down only when the caller reports a smaller item count.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use crate::Time;

/// Version written into every persisted record.
pub const RECORD_VERSION: u32 = 1;

/// The most recent explicit completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Zero-based index of the completed item
    pub index: usize,

    /// When the item was completed
    pub at: Time,
}

/// In-memory unlock state.
///
/// The completion index and date are kept together in [`Completion`], so
/// one can never be present without the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockState {
    /// Number of unlocked items (the unlock frontier)
    pub unlocked_count: usize,

    /// Most recent completion, if any
    pub last_completion: Option<Completion>,
}

impl Default for UnlockState {
    fn default() -> Self {
        Self {
            unlocked_count: 1,
            last_completion: None,
        }
    }
}

impl UnlockState {
    /// Index of the most recently completed item.
    pub fn last_completed_index(&self) -> Option<usize> {
        self.last_completion.map(|c| c.index)
    }

    /// When the most recently completed item was completed.
    pub fn last_completion_date(&self) -> Option<Time> {
        self.last_completion.map(|c| c.at)
    }

    /// The item after the last completion, if it exists and is still locked.
    fn pending(&self, total_items: usize) -> Option<(usize, Time)> {
        let completion = self.last_completion?;
        let next = completion.index.checked_add(1)?;
        (next < total_items && self.unlocked_count <= next).then_some((next, completion.at))
    }

    /// Unlock the item after the last completion once `interval` has passed.
    ///
    /// This is the only transition that grows `unlocked_count`. Returns
    /// `true` if the frontier moved.
    pub fn refresh_unlock(&mut self, total_items: usize, now: Time, interval: Duration) -> bool {
        if total_items == 0 {
            return false;
        }
        let Some((next, completed_at)) = self.pending(total_items) else {
            return false;
        };
        // A clock that went backwards yields a negative elapsed time and never unlocks.
        if now.signed_duration_since(completed_at) < interval {
            return false;
        }

        let unlocked = total_items.min(next + 1);
        if unlocked <= self.unlocked_count {
            return false;
        }
        self.unlocked_count = unlocked;
        true
    }

    /// Clamp the state into the invariants for `total_items`.
    ///
    /// `None` means the item count is not known yet, in which case only the
    /// `unlocked_count >= 1` floor is enforced.
    pub fn sanitize(&mut self, total_items: Option<usize>) {
        let Some(total) = total_items else {
            self.unlocked_count = self.unlocked_count.max(1);
            return;
        };

        let minimum = usize::from(total > 0);
        self.unlocked_count = self.unlocked_count.clamp(minimum, total);

        self.last_completion = match self.last_completion {
            Some(c) if c.index >= total => total
                .checked_sub(1)
                .map(|index| Completion { index, ..c }),
            other => other,
        };
    }

    /// When the next sequential item unlocks, if one is waiting on the interval.
    pub fn next_unlock_date(&self, total_items: usize, interval: Duration) -> Option<Time> {
        let completion = self.last_completion?;
        if self.unlocked_count <= completion.index.saturating_add(1) && self.unlocked_count < total_items {
            completion.at.checked_add_signed(interval)
        } else {
            None
        }
    }
}

/// Persisted form of [`UnlockState`].
///
/// Keeps the flat three-field layout (`unlockedCount`, `lastCompletedIndex`,
/// `lastCompletionDate`) so records stay readable by other implementations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockRecord {
    /// Record layout version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Number of unlocked items
    pub unlocked_count: usize,

    /// Index of the last completed item
    #[serde(default)]
    pub last_completed_index: Option<usize>,

    /// When the last completed item was completed (RFC 3339)
    #[serde(default)]
    pub last_completion_date: Option<Time>,
}

fn default_version() -> u32 {
    RECORD_VERSION
}

impl UnlockRecord {
    /// Serialize to JSON bytes.
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Parse from JSON bytes.
    pub fn decode(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

impl From<&UnlockState> for UnlockRecord {
    fn from(state: &UnlockState) -> Self {
        Self {
            version: RECORD_VERSION,
            unlocked_count: state.unlocked_count,
            last_completed_index: state.last_completed_index(),
            last_completion_date: state.last_completion_date(),
        }
    }
}

impl From<UnlockRecord> for UnlockState {
    /// A record holding only half of the completion pair loses both halves.
    fn from(record: UnlockRecord) -> Self {
        let last_completion = record
            .last_completed_index
            .zip(record.last_completion_date)
            .map(|(index, at)| Completion { index, at });
        Self {
            unlocked_count: record.unlocked_count,
            last_completion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> Time {
        chrono::Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn interval() -> Duration {
        Duration::minutes(5)
    }

    fn completed(unlocked_count: usize, index: usize, at: Time) -> UnlockState {
        UnlockState {
            unlocked_count,
            last_completion: Some(Completion { index, at }),
        }
    }

    #[test]
    fn test_default_unlocks_first_item() {
        let state = UnlockState::default();
        assert_eq!(state.unlocked_count, 1);
        assert!(state.last_completion.is_none());
        assert!(state.last_completed_index().is_none());
        assert!(state.last_completion_date().is_none());
    }

    #[test]
    fn test_refresh_waits_for_interval() {
        let mut state = completed(1, 0, t0());

        let almost = t0() + interval() - Duration::milliseconds(1);
        assert!(!state.refresh_unlock(5, almost, interval()));
        assert_eq!(state.unlocked_count, 1);

        assert!(state.refresh_unlock(5, t0() + interval(), interval()));
        assert_eq!(state.unlocked_count, 2);
    }

    #[test]
    fn test_refresh_unlocks_only_one_item() {
        let mut state = completed(1, 0, t0());
        assert!(state.refresh_unlock(5, t0() + Duration::days(30), interval()));
        assert_eq!(state.unlocked_count, 2);

        // Nothing more unlocks until item 1 is completed.
        assert!(!state.refresh_unlock(5, t0() + Duration::days(60), interval()));
        assert_eq!(state.unlocked_count, 2);
    }

    #[test]
    fn test_refresh_without_completion_is_noop() {
        let mut state = UnlockState::default();
        assert!(!state.refresh_unlock(5, t0() + Duration::days(1), interval()));
        assert_eq!(state, UnlockState::default());
    }

    #[test]
    fn test_refresh_stops_at_last_item() {
        let mut state = completed(3, 2, t0());
        assert!(!state.refresh_unlock(3, t0() + Duration::days(1), interval()));
        assert_eq!(state.unlocked_count, 3);
    }

    #[test]
    fn test_refresh_with_backwards_clock_does_not_unlock() {
        let mut state = completed(1, 0, t0());
        assert!(!state.refresh_unlock(5, t0() - Duration::hours(1), interval()));
        assert_eq!(state.unlocked_count, 1);
    }

    #[test]
    fn test_max_completion_index_does_not_overflow() {
        let mut state = completed(1, usize::MAX, t0());
        assert!(!state.refresh_unlock(5, t0() + Duration::days(1), interval()));
        assert_eq!(state.next_unlock_date(5, interval()), Some(t0() + interval()));

        state.sanitize(Some(5));
        assert_eq!(state.last_completed_index(), Some(4));
    }

    #[test]
    fn test_sanitize_unknown_total_only_enforces_floor() {
        let mut state = UnlockState {
            unlocked_count: 0,
            last_completion: None,
        };
        state.sanitize(None);
        assert_eq!(state.unlocked_count, 1);

        let mut large = completed(40, 39, t0());
        large.sanitize(None);
        assert_eq!(large, completed(40, 39, t0()));
    }

    #[test]
    fn test_sanitize_shrink_clamps_frontier_and_completion() {
        let mut state = completed(5, 4, t0());
        state.sanitize(Some(3));
        assert_eq!(state.unlocked_count, 3);
        assert_eq!(state.last_completed_index(), Some(2));
        assert_eq!(state.last_completion_date(), Some(t0()));
    }

    #[test]
    fn test_sanitize_zero_total_clears_everything() {
        let mut state = completed(5, 4, t0());
        state.sanitize(Some(0));
        assert_eq!(state.unlocked_count, 0);
        assert!(state.last_completion.is_none());
    }

    #[test]
    fn test_sanitize_raises_floor_for_nonempty_track() {
        let mut state = UnlockState {
            unlocked_count: 0,
            last_completion: None,
        };
        state.sanitize(Some(4));
        assert_eq!(state.unlocked_count, 1);
    }

    #[test]
    fn test_next_unlock_date_pending() {
        let state = completed(2, 1, t0());
        assert_eq!(state.next_unlock_date(5, interval()), Some(t0() + interval()));
    }

    #[test]
    fn test_next_unlock_date_absent_when_already_unlocked() {
        let state = completed(3, 1, t0());
        assert_eq!(state.next_unlock_date(5, interval()), None);
    }

    #[test]
    fn test_next_unlock_date_absent_when_exhausted() {
        let state = completed(5, 4, t0());
        assert_eq!(state.next_unlock_date(5, interval()), None);
        assert_eq!(UnlockState::default().next_unlock_date(5, interval()), None);
    }

    #[test]
    fn test_record_uses_flat_camel_case_layout() {
        let record = UnlockRecord::from(&completed(2, 1, t0()));
        let json: serde_json::Value = serde_json::from_slice(&record.encode().unwrap()).unwrap();

        assert_eq!(json["unlockedCount"], 2);
        assert_eq!(json["lastCompletedIndex"], 1);
        assert_eq!(json["lastCompletionDate"], "2024-03-01T12:00:00Z");
        assert_eq!(json["version"], RECORD_VERSION);
    }

    #[test]
    fn test_record_without_optional_fields_decodes() {
        let record = UnlockRecord::decode(br#"{"unlockedCount": 3}"#).unwrap();
        assert_eq!(record.version, RECORD_VERSION);
        let state = UnlockState::from(record);
        assert_eq!(state.unlocked_count, 3);
        assert!(state.last_completion.is_none());
    }

    #[test]
    fn test_half_present_completion_is_dropped() {
        let record = UnlockRecord::decode(br#"{"unlockedCount": 2, "lastCompletedIndex": 1}"#).unwrap();
        let state = UnlockState::from(record);
        assert!(state.last_completion.is_none());
        assert!(state.last_completion_date().is_none());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(UnlockRecord::decode(b"not json").is_err());
        assert!(UnlockRecord::decode(br#"{"unlockedCount": -1}"#).is_err());
    }
}
