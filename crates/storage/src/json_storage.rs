//! JSON file storage implementation.
//!
//! Stores each key as `<root>/<key>.json`. Writes go to a temporary sibling
//! file first and are moved into place with a rename, so a crash mid-write
//! leaves the previous record intact.

use std::path::{Path, PathBuf};
use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use super::{validate_key, ByteStore, Result};

/// File-based JSON storage backend.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Create storage rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Directory holding the record files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.root.join(format!(".{}.json.tmp", key))
    }
}

#[async_trait]
impl ByteStore for JsonFileStore {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        match fs::read(self.record_path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        validate_key(key)?;
        let tmp = self.temp_path(key);
        let path = self.record_path(key);

        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &path).await?;

        debug!("Saved {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageError;

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path()).await.unwrap();

        store.save("progress", br#"{"unlockedCount":1}"#).await.unwrap();
        let loaded = store.load("progress").await.unwrap();

        assert_eq!(loaded, Some(br#"{"unlockedCount":1}"#.to_vec()));
        assert!(dir.path().join("progress.json").exists());
        assert!(!dir.path().join(".progress.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_save_replaces_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path()).await.unwrap();

        store.save("progress", b"first").await.unwrap();
        store.save("progress", b"second").await.unwrap();

        assert_eq!(store.load("progress").await.unwrap(), Some(b"second".to_vec()));
    }

    #[tokio::test]
    async fn test_missing_key_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).await.unwrap();
        assert!(store.load("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_new_creates_nested_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("a").join("b");
        let store = JsonFileStore::new(&root).await.unwrap();
        assert!(root.is_dir());
        assert_eq!(store.root(), root.as_path());
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path()).await.unwrap();

        let err = store.save("../escape", b"x").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
        assert!(matches!(store.load("a/b").await, Err(StorageError::InvalidKey(_))));
    }
}
