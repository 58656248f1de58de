//! Project Registry
//! Persisted catalog of projects keyed by name

use crate::constants::store::PROJECT_KEY_PREFIX;
use crate::domain::ports::StateStore;
use crate::domain::services::manifest::read_manifest;
use crate::domain::services::RuntimeStateStore;
use crate::domain::{DomainError, Project};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

fn project_key(name: &str) -> String {
    format!("{}{}", PROJECT_KEY_PREFIX, name)
}

pub struct ProjectRegistry {
    store: Arc<dyn StateStore>,
    states: Arc<RuntimeStateStore>,
}

impl ProjectRegistry {
    pub fn new(store: Arc<dyn StateStore>, states: Arc<RuntimeStateStore>) -> Self {
        Self { store, states }
    }

    /// Register (or re-register) the project whose manifest lives in `working_dir`
    pub async fn register(&self, working_dir: &Path) -> Result<String, DomainError> {
        let project = read_manifest(working_dir).await?;
        let name = project.name().to_string();

        self.store
            .put(&project_key(&name), serde_json::to_string(&project)?)
            .await?;

        info!(
            project = %name,
            working_dir = %project.working_dir().display(),
            entry_point = %project.entry_point(),
            "Project registered"
        );
        Ok(name)
    }

    pub async fn get(&self, name: &str) -> Result<Project, DomainError> {
        match self.store.get(&project_key(name)).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Err(DomainError::NotFound(name.to_string())),
        }
    }

    pub async fn exists(&self, name: &str) -> Result<bool, DomainError> {
        Ok(self.store.get(&project_key(name)).await?.is_some())
    }

    /// All projects, sorted by name
    pub async fn list(&self) -> Result<Vec<Project>, DomainError> {
        let entries = self.store.scan_prefix(PROJECT_KEY_PREFIX).await?;
        debug!(count = entries.len(), "Listing projects");

        entries
            .into_iter()
            .map(|(_, raw)| serde_json::from_str(&raw).map_err(DomainError::from))
            .collect()
    }

    /// Remove a stopped project along with its runtime state
    pub async fn remove(&self, name: &str) -> Result<(), DomainError> {
        let guard = self.states.lock(name).await;

        if !self.exists(name).await? {
            return Err(DomainError::NotFound(name.to_string()));
        }
        if let Some(state) = self.states.get_locked(&guard).await? {
            if state.is_running() {
                return Err(DomainError::ProjectRunning(name.to_string()));
            }
        }

        self.store.delete(&project_key(name)).await?;
        self.states.delete_locked(&guard).await?;

        info!(project = %name, "Project removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::runtime_state_store::test_support::MockExecutor;
    use crate::domain::RuntimeState;
    use crate::infrastructure::InMemoryStateStore;
    use chrono::Utc;

    struct Fixture {
        dir: tempfile::TempDir,
        executor: Arc<MockExecutor>,
        states: Arc<RuntimeStateStore>,
        registry: ProjectRegistry,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        let executor = Arc::new(MockExecutor::new());
        let states = Arc::new(RuntimeStateStore::new(store.clone(), executor.clone()));
        let registry = ProjectRegistry::new(store, states.clone());
        Fixture {
            dir: tempfile::tempdir().unwrap(),
            executor,
            states,
            registry,
        }
    }

    fn write_manifest(dir: &Path, name: &str, main: &str) {
        std::fs::write(
            dir.join("package.json"),
            format!(r#"{{"name":"{}","main":"{}"}}"#, name, main),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let f = fixture();
        write_manifest(f.dir.path(), "sample", "index.js");

        let name = f.registry.register(f.dir.path()).await.unwrap();
        assert_eq!(name, "sample");

        let project = f.registry.get("sample").await.unwrap();
        assert_eq!(project.entry_point(), "index.js");
        assert_eq!(f.registry.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_unknown() {
        let f = fixture();
        assert_eq!(
            f.registry.get("ghost").await.unwrap_err(),
            DomainError::NotFound("ghost".to_string())
        );
    }

    #[tokio::test]
    async fn test_reregister_overwrites_descriptor_keeps_state() {
        let f = fixture();
        write_manifest(f.dir.path(), "sample", "index.js");
        f.registry.register(f.dir.path()).await.unwrap();

        let state = RuntimeState::started(99, "/tmp/sample.log", Utc::now()).exited(Utc::now());
        f.states.put("sample", &state).await.unwrap();

        write_manifest(f.dir.path(), "sample", "server.js");
        f.registry.register(f.dir.path()).await.unwrap();

        assert_eq!(f.registry.get("sample").await.unwrap().entry_point(), "server.js");
        assert_eq!(f.registry.list().await.unwrap().len(), 1);
        assert_eq!(f.states.get("sample").await.unwrap(), state);
    }

    #[tokio::test]
    async fn test_remove_rejected_while_running() {
        let f = fixture();
        write_manifest(f.dir.path(), "sample", "index.js");
        f.registry.register(f.dir.path()).await.unwrap();

        f.executor.running.lock().await.insert(321);
        f.states
            .put("sample", &RuntimeState::started(321, "/tmp/s.log", Utc::now()))
            .await
            .unwrap();

        assert_eq!(
            f.registry.remove("sample").await.unwrap_err(),
            DomainError::ProjectRunning("sample".to_string())
        );

        // process disappears, reconciliation lets the removal through
        f.executor.vanish(321).await;
        f.registry.remove("sample").await.unwrap();

        assert!(matches!(
            f.registry.get("sample").await,
            Err(DomainError::NotFound(_))
        ));
        assert!(matches!(
            f.states.get("sample").await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_unknown() {
        let f = fixture();
        assert!(matches!(
            f.registry.remove("ghost").await,
            Err(DomainError::NotFound(_))
        ));
    }
}
