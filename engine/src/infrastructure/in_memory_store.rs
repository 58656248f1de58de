//! In-Memory State Store
//! Thread-safe implementation of the StateStore port

use crate::domain::{ports::StateStore, DomainError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Thread-safe in-memory key-value store
///
/// Keeps keys ordered so prefix scans come back sorted, like the SQLite store.
#[derive(Clone, Default)]
pub struct InMemoryStateStore {
    entries: Arc<RwLock<BTreeMap<String, String>>>,
    closed: Arc<AtomicBool>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DomainError::Storage("store is closed".to_string()));
        }
        Ok(())
    }
}

fn poisoned<T>(_: T) -> DomainError {
    DomainError::Storage("store lock poisoned".to_string())
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        self.ensure_open()?;
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), DomainError> {
        self.ensure_open()?;
        debug!(key = %key, "Storing entry");
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), DomainError> {
        self.ensure_open()?;
        debug!(key = %key, "Deleting entry");
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.remove(key);
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, DomainError> {
        self.ensure_open()?;
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn close(&self) -> Result<(), DomainError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = InMemoryStateStore::new();

        store.put("project-a", "{}".to_string()).await.unwrap();
        assert_eq!(store.get("project-a").await.unwrap(), Some("{}".to_string()));

        store.put("project-a", "[]".to_string()).await.unwrap();
        assert_eq!(store.get("project-a").await.unwrap(), Some("[]".to_string()));

        store.delete("project-a").await.unwrap();
        assert_eq!(store.get("project-a").await.unwrap(), None);

        // absent key
        store.delete("project-a").await.unwrap();
    }

    #[tokio::test]
    async fn test_scan_prefix_sorted_and_scoped() {
        let store = InMemoryStateStore::new();
        store.put("state-b", "2".to_string()).await.unwrap();
        store.put("project-z", "z".to_string()).await.unwrap();
        store.put("state-a", "1".to_string()).await.unwrap();
        store.put("statf", "x".to_string()).await.unwrap();

        let states = store.scan_prefix("state-").await.unwrap();
        assert_eq!(
            states,
            vec![
                ("state-a".to_string(), "1".to_string()),
                ("state-b".to_string(), "2".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_closed_store_rejects_calls() {
        let store = InMemoryStateStore::new();
        store.close().await.unwrap();

        let err = store.get("project-a").await.unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));
    }
}
