//! StateStore port
//! Durable string key-value store holding descriptors and runtime states

use crate::domain::DomainError;
use async_trait::async_trait;

/// Port for the persistent key-value store
///
/// Values are JSON documents; keys are namespaced by prefix
/// (`project-<name>`, `state-<name>`).
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Insert or overwrite
    async fn put(&self, key: &str, value: String) -> Result<(), DomainError>;

    /// Delete a key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), DomainError>;

    /// All entries whose key starts with `prefix`, sorted by key
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, DomainError>;

    /// Flush and release the underlying storage. Later calls fail with `Storage`.
    async fn close(&self) -> Result<(), DomainError>;
}
