//! Time-gated sequential unlock engine.
//!
//! Items of a track unlock one at a time: after an item is completed, the
//! next one becomes available once the unlock interval has passed. The
//! engine owns the in-memory state, writes it through a [`ByteStore`] on
//! every change and broadcasts a [`ProgressEvent`] afterwards.

use chrono::Duration;
use dripfeed_core::{
    ChangeKind, Completion, ProgressEvent, Time, UnlockRecord, UnlockSnapshot, UnlockState,
};
use dripfeed_storage::ByteStore;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, EngineConfig};

/// Result of a [`UnlockProgressEngine::mark_completed`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// The completion was recorded (or refreshed, for the same index)
    Recorded,
    /// The item is still locked; nothing was recorded
    Locked,
    /// The item is behind the last completion; the frontier stays put
    Stale,
    /// The track has no items
    Empty,
}

impl MarkOutcome {
    /// Whether the completion was recorded.
    pub fn is_recorded(&self) -> bool {
        matches!(self, MarkOutcome::Recorded)
    }
}

struct Inner<S> {
    state: UnlockState,
    store: S,
}

impl<S: ByteStore> Inner<S> {
    async fn persist(&mut self, key: &str) -> dripfeed_storage::Result<()> {
        let bytes = UnlockRecord::from(&self.state).encode()?;
        self.store.save(key, &bytes).await
    }
}

/// Unlock progress engine for a single track.
///
/// All operations run under one lock, so at most one read-refresh-write
/// sequence is in flight. Events are sent after the lock is released.
pub struct UnlockProgressEngine<S: ByteStore> {
    inner: Mutex<Inner<S>>,
    config: EngineConfig,
    events: broadcast::Sender<ProgressEvent>,
}

impl<S: ByteStore> UnlockProgressEngine<S> {
    /// Create an engine, loading any previously saved progress.
    ///
    /// Missing or unreadable records start the track from scratch with the
    /// first item unlocked.
    pub async fn new(store: S, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut state = load_state(&store, &config.storage_key).await;
        state.sanitize(None);

        let (events, _) = broadcast::channel(config.event_capacity);

        Ok(Self {
            inner: Mutex::new(Inner { state, store }),
            config,
            events,
        })
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn interval(&self) -> Duration {
        self.config.unlock_interval
    }

    /// Subscribe to change events.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    /// Copy of the current state, without applying any pending unlock.
    pub async fn state(&self) -> UnlockState {
        self.inner.lock().await.state.clone()
    }

    /// Progress of a track of `total_items` items as of `now`.
    ///
    /// Applies any unlock that became due and clamps the state to
    /// `total_items`; persists and notifies only if that changed something.
    pub async fn snapshot(&self, total_items: usize, now: Time) -> UnlockSnapshot {
        let interval = self.interval();
        let mut inner = self.inner.lock().await;
        let before = inner.state.clone();

        let unlocked = inner.state.refresh_unlock(total_items, now, interval);
        inner.state.sanitize(Some(total_items));

        let snapshot = UnlockSnapshot::from_state(&inner.state, total_items, interval);
        let kind = if unlocked {
            ChangeKind::Unlocked
        } else {
            ChangeKind::Sanitized
        };
        let event = self.commit(&mut inner, &before, kind, now, &snapshot).await;
        drop(inner);

        self.emit(event);
        snapshot
    }

    /// Record that the item at `index` was completed at `now`.
    ///
    /// Locked items are ignored, and completing an item behind the last
    /// completion does not move the completion frontier back. Completing the
    /// last completed item again refreshes its completion time.
    pub async fn mark_completed(&self, index: usize, total_items: usize, now: Time) -> MarkOutcome {
        let interval = self.interval();
        let mut inner = self.inner.lock().await;
        let before = inner.state.clone();

        let unlocked = inner.state.refresh_unlock(total_items, now, interval);
        inner.state.sanitize(Some(total_items));

        let outcome = if total_items == 0 {
            MarkOutcome::Empty
        } else if index >= inner.state.unlocked_count {
            debug!(
                "Ignoring completion of locked item {} ({} unlocked)",
                index, inner.state.unlocked_count
            );
            MarkOutcome::Locked
        } else if inner
            .state
            .last_completed_index()
            .is_some_and(|previous| index < previous)
        {
            debug!("Ignoring completion of item {} behind the frontier", index);
            MarkOutcome::Stale
        } else {
            inner.state.last_completion = Some(Completion { index, at: now });
            inner.state.sanitize(Some(total_items));
            MarkOutcome::Recorded
        };

        let kind = match (outcome, unlocked) {
            (MarkOutcome::Recorded, _) => ChangeKind::Completed,
            (_, true) => ChangeKind::Unlocked,
            _ => ChangeKind::Sanitized,
        };
        let snapshot = UnlockSnapshot::from_state(&inner.state, total_items, interval);
        let event = self.commit(&mut inner, &before, kind, now, &snapshot).await;
        drop(inner);

        self.emit(event);
        outcome
    }

    /// Restore the initial state: first item unlocked, nothing completed.
    pub async fn reset(&self, total_items: usize, now: Time) -> UnlockSnapshot {
        let interval = self.interval();
        let mut inner = self.inner.lock().await;
        let before = inner.state.clone();

        inner.state = UnlockState::default();
        inner.state.sanitize(Some(total_items));

        let snapshot = UnlockSnapshot::from_state(&inner.state, total_items, interval);
        let event = self
            .commit(&mut inner, &before, ChangeKind::Reset, now, &snapshot)
            .await;
        drop(inner);

        self.emit(event);
        snapshot
    }

    /// Persist the state if it differs from `before` and build the event to
    /// send once the lock is released.
    async fn commit(
        &self,
        inner: &mut Inner<S>,
        before: &UnlockState,
        kind: ChangeKind,
        now: Time,
        snapshot: &UnlockSnapshot,
    ) -> Option<ProgressEvent> {
        if inner.state == *before {
            return None;
        }

        // Write failures are not fatal: the in-memory state stays
        // authoritative and the next change writes it again.
        if let Err(e) = inner.persist(&self.config.storage_key).await {
            warn!("Failed to persist unlock progress: {}", e);
        }

        info!(
            "Progress {}: {} of {} unlocked, last completed {:?}",
            kind, snapshot.unlocked_count, snapshot.total_items, snapshot.last_completed_index
        );
        Some(ProgressEvent::new(kind, now, snapshot.clone()))
    }

    fn emit(&self, event: Option<ProgressEvent>) {
        let Some(event) = event else {
            return;
        };
        if self.events.send(event).is_err() {
            debug!("No subscribers for progress event");
        }
    }
}

async fn load_state<S: ByteStore>(store: &S, key: &str) -> UnlockState {
    match store.load(key).await {
        Ok(Some(bytes)) => match UnlockRecord::decode(&bytes) {
            Ok(record) => UnlockState::from(record),
            Err(e) => {
                warn!("Discarding unreadable progress record {:?}: {}", key, e);
                UnlockState::default()
            }
        },
        Ok(None) => UnlockState::default(),
        Err(e) => {
            warn!("Failed to load progress record {:?}: {}", key, e);
            UnlockState::default()
        }
    }
}
