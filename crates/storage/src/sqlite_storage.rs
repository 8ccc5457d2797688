//! SQLite storage backend for dripfeed.
//!
//! Keeps every record in a single `kv` table keyed by record name. Useful
//! when a host already ships an SQLite database and wants progress next to
//! its other data.

use std::path::Path;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::Row;

use super::trait_::{validate_key, ByteStore, Result, StorageError};

/// SQLite storage implementation.
#[derive(Clone)]
pub struct SqliteStore {
    /// Database connection pool
    pool: sqlx::SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(backend)?;

        let store = Self { pool };
        store.init_schema().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store for testing.
    pub async fn in_memory() -> Result<Self> {
        // Each in-memory connection is its own database, so stay on one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(backend)?;

        let store = Self { pool };
        store.init_schema().await?;

        Ok(store)
    }

    /// Initialize the database schema.
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }
}

fn backend(e: sqlx::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

#[async_trait]
impl ByteStore for SqliteStore {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let row = sqlx::query("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match row {
            Some(row) => Ok(Some(row.try_get("value").map_err(backend)?)),
            None => Ok(None),
        }
    }

    async fn save(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        validate_key(key)?;
        sqlx::query(
            "INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(bytes)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let mut store = SqliteStore::in_memory().await.unwrap();

        assert!(store.load("progress").await.unwrap().is_none());
        store.save("progress", b"first").await.unwrap();
        store.save("progress", b"second").await.unwrap();

        assert_eq!(store.load("progress").await.unwrap(), Some(b"second".to_vec()));
    }

    #[tokio::test]
    async fn test_file_database_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.db");

        let mut store = SqliteStore::open(&path).await.unwrap();
        store.save("progress", b"kept").await.unwrap();
        drop(store);

        let reopened = SqliteStore::open(&path).await.unwrap();
        assert_eq!(reopened.load("progress").await.unwrap(), Some(b"kept".to_vec()));
    }
}
