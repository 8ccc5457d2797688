//! Progress Tracking
//!
//! Time-gated sequential unlocking: the unlock engine, its configuration,
//! and schedule estimation.

#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod schedule;

pub use config::{EngineConfig, ConfigError, DEFAULT_STORAGE_KEY, DEFAULT_UNLOCK_INTERVAL_SECS};
pub use engine::{UnlockProgressEngine, MarkOutcome};
pub use schedule::UnlockEstimator;
