//! SQLite State Store
//! Durable implementation of the StateStore port backed by a single `kv` table
//!
//! The connection lives behind a mutex and every statement runs on tokio's
//! blocking pool, so synchronous SQLite I/O never stalls async workers.

use crate::domain::{ports::StateStore, DomainError};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);";

#[derive(Clone)]
pub struct SqliteStateStore {
    inner: Arc<Mutex<Option<Connection>>>,
}

impl SqliteStateStore {
    /// Open (or create) the database at `path`, creating parent directories
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path).map_err(storage_err)?;
        let store = Self::from_connection(conn)?;
        info!(path = %path.display(), "Opened state database");
        Ok(store)
    }

    /// In-memory database, for tests
    pub fn open_in_memory() -> Result<Self, DomainError> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, DomainError> {
        conn.execute_batch(SCHEMA).map_err(storage_err)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(Some(conn))),
        })
    }

    /// Run `f` against the connection on a blocking thread
    async fn call<F, R>(&self, f: F) -> Result<R, DomainError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = inner
                .lock()
                .map_err(|_| DomainError::Storage("database lock poisoned".to_string()))?;
            let conn = guard
                .as_ref()
                .ok_or_else(|| DomainError::Storage("database is closed".to_string()))?;
            f(conn).map_err(storage_err)
        })
        .await
        .map_err(|e| DomainError::Storage(format!("database task panicked: {}", e)))?
    }
}

fn storage_err(err: rusqlite::Error) -> DomainError {
    DomainError::Storage(err.to_string())
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        let key = key.to_string();
        self.call(move |conn| {
            conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
        })
        .await
    }

    async fn put(&self, key: &str, value: String) -> Result<(), DomainError> {
        debug!(key = %key, "Storing entry");
        let key = key.to_string();
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map(|_| ())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), DomainError> {
        debug!(key = %key, "Deleting entry");
        let key = key.to_string();
        self.call(move |conn| {
            conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
                .map(|_| ())
        })
        .await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, DomainError> {
        let prefix = prefix.to_string();
        self.call(move |conn| {
            // substr comparison avoids LIKE wildcard escaping
            let mut stmt = conn.prepare(
                "SELECT key, value FROM kv
                 WHERE substr(key, 1, length(?1)) = ?1
                 ORDER BY key",
            )?;
            let rows = stmt.query_map(params![prefix], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect()
        })
        .await
    }

    async fn close(&self) -> Result<(), DomainError> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = inner
                .lock()
                .map_err(|_| DomainError::Storage("database lock poisoned".to_string()))?;
            if let Some(conn) = guard.take() {
                conn.close().map_err(|(_, e)| storage_err(e))?;
                info!("Closed state database");
            }
            Ok(())
        })
        .await
        .map_err(|e| DomainError::Storage(format!("database task panicked: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = SqliteStateStore::open_in_memory().unwrap();

        store.put("state-a", "1".to_string()).await.unwrap();
        store.put("state-a", "2".to_string()).await.unwrap();

        assert_eq!(store.get("state-a").await.unwrap(), Some("2".to_string()));
        assert_eq!(store.get("state-b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_scan_prefix_treats_wildcards_literally() {
        let store = SqliteStateStore::open_in_memory().unwrap();
        store.put("project-a_b", "x".to_string()).await.unwrap();
        store.put("project-aXb", "y".to_string()).await.unwrap();
        store.put("state-a_b", "z".to_string()).await.unwrap();

        let rows = store.scan_prefix("project-a_").await.unwrap();
        assert_eq!(rows, vec![("project-a_b".to_string(), "x".to_string())]);

        let all = store.scan_prefix("project-").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].0, "project-aXb");
    }

    #[tokio::test]
    async fn test_close_then_use_fails() {
        let store = SqliteStateStore::open_in_memory().unwrap();
        store.close().await.unwrap();
        // second close is a no-op
        store.close().await.unwrap();

        let err = store.put("state-a", "1".to_string()).await.unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));
    }

    #[tokio::test]
    async fn test_file_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bulk-pm.db");

        let store = SqliteStateStore::open(&path).unwrap();
        store.put("project-a", "{\"name\":\"a\"}".to_string()).await.unwrap();
        store.close().await.unwrap();

        let reopened = SqliteStateStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("project-a").await.unwrap(),
            Some("{\"name\":\"a\"}".to_string())
        );
    }
}
