//! dripfeed core data models.
//!
//! This crate defines the state of a time-gated sequential unlock track:
//! how many items are unlocked, which item was completed last, and the
//! read-only projections handed to callers.

#![warn(missing_docs)]

// Core identities
mod id;

// Unlock state and projections
mod state;
mod snapshot;
mod event;

// Re-exports
pub use id::*;

pub use state::{Completion, UnlockState, UnlockRecord, RECORD_VERSION};
pub use snapshot::{UnlockSnapshot, ItemState};
pub use event::{ProgressEvent, ChangeKind};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
