//! Storage trait abstraction.

use async_trait::async_trait;

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Key contains characters a backend cannot address
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),

    /// Backend-specific failure
    #[error("{0}")]
    Backend(String),
}

/// Key-value byte store holding serialized progress records.
///
/// Backends know nothing about what the bytes mean.
#[async_trait]
pub trait ByteStore: Send + Sync {
    /// Load the bytes saved under `key`, `None` if nothing was saved.
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Save `bytes` under `key`, replacing any previous value.
    async fn save(&mut self, key: &str, bytes: &[u8]) -> Result<()>;
}

/// Check that `key` is non-empty and only uses `[A-Za-z0-9_-]`.
///
/// Keys end up in file names, so anything that could escape the store root
/// is refused.
pub fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
