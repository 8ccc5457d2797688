//! Storage abstraction and implementations for dripfeed.
//!
//! Progress records are opaque bytes stored under a key. This crate provides
//! the key-value trait plus an in-memory store, a JSON file store, and an
//! optional SQLite store (feature `sqlite`).

#![warn(missing_docs)]

pub mod trait_;
pub mod memory;
#[cfg(feature = "json")]
pub mod json_storage;
#[cfg(feature = "sqlite")]
pub mod sqlite_storage;

pub use trait_::{ByteStore, StorageError, Result, validate_key};
pub use memory::MemoryStore;
#[cfg(feature = "json")]
pub use json_storage::JsonFileStore;
#[cfg(feature = "sqlite")]
pub use sqlite_storage::SqliteStore;
