//! Application
//! Composition root and control boundary: wires the store and executor into
//! the registry, runtime state store, supervisor and log reader

use crate::domain::ports::{ProcessExecutor, StateStore};
use crate::domain::services::{
    ClusterLauncher, LogReader, ProcessSupervisionService, ProjectRegistry, RuntimeStateStore,
    StateEvent, SupervisorConfig,
};
use crate::domain::{DomainError, Project, RuntimeState};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

pub struct Application {
    store: Arc<dyn StateStore>,
    registry: Arc<ProjectRegistry>,
    supervisor: ProcessSupervisionService,
    logs: LogReader,
    launcher: ClusterLauncher,
}

impl Application {
    /// # Arguments
    ///
    /// * `store` - Persistent key-value store for descriptors and runtime state
    /// * `executor` - Process execution adapter
    /// * `config` - Interpreter, log directory and restart backoff
    pub fn new(
        store: Arc<dyn StateStore>,
        executor: Arc<dyn ProcessExecutor>,
        config: SupervisorConfig,
    ) -> Self {
        let states = Arc::new(RuntimeStateStore::new(store.clone(), executor.clone()));
        let registry = Arc::new(ProjectRegistry::new(store.clone(), states.clone()));
        let supervisor =
            ProcessSupervisionService::new(registry.clone(), states.clone(), executor, config);
        let logs = LogReader::new(states);

        Self {
            store,
            registry,
            supervisor,
            logs,
            launcher: ClusterLauncher::new(),
        }
    }

    pub async fn register(&self, working_dir: impl AsRef<Path>) -> Result<String, DomainError> {
        self.registry.register(working_dir.as_ref()).await
    }

    pub async fn get(&self, name: &str) -> Result<Project, DomainError> {
        self.registry.get(name).await
    }

    pub async fn list(&self) -> Result<Vec<Project>, DomainError> {
        self.registry.list().await
    }

    pub async fn remove(&self, name: &str) -> Result<(), DomainError> {
        self.registry.remove(name).await
    }

    pub async fn status_all(&self) -> Result<BTreeMap<String, RuntimeState>, DomainError> {
        self.supervisor.status_all().await
    }

    /// Reconciled state. A registered project that never started reads as PID=0.
    pub async fn status(&self, name: &str) -> Result<RuntimeState, DomainError> {
        match self.supervisor.status(name).await {
            Err(DomainError::NotFound(_)) => {
                if self.registry.exists(name).await? {
                    Ok(RuntimeState::default())
                } else {
                    Err(DomainError::NotFound(name.to_string()))
                }
            }
            other => other,
        }
    }

    pub async fn start(&self, name: &str, instances: u32) -> Result<RuntimeState, DomainError> {
        self.supervisor.start(name, instances).await
    }

    pub async fn stop(&self, name: &str) -> Result<(), DomainError> {
        self.supervisor.stop(name).await
    }

    pub async fn tail(&self, name: &str, max_lines: usize) -> Result<Vec<String>, DomainError> {
        self.logs.tail(name, max_lines).await
    }

    /// Write the cluster launcher for a registered project without starting it
    pub async fn generate_launcher(
        &self,
        name: &str,
        instances: u32,
    ) -> Result<PathBuf, DomainError> {
        let project = self.registry.get(name).await?;
        self.launcher
            .generate(project.working_dir(), project.entry_point(), instances)
            .await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.supervisor.subscribe()
    }

    /// Kill every running project
    pub async fn stop_all(&self) {
        self.supervisor.shutdown().await;
    }

    /// Release the store. The application is unusable afterwards.
    pub async fn close(&self) -> Result<(), DomainError> {
        info!("Closing state store");
        self.store.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::runtime_state_store::test_support::MockExecutor;
    use crate::infrastructure::InMemoryStateStore;

    fn app(dir: &Path) -> Application {
        let config = SupervisorConfig {
            log_dir: dir.join("logs"),
            ..SupervisorConfig::default()
        };
        Application::new(
            Arc::new(InMemoryStateStore::new()),
            Arc::new(MockExecutor::new()),
            config,
        )
    }

    fn sample_project(root: &Path) -> PathBuf {
        let dir = root.join("sample");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(
            dir.join("package.json"),
            r#"{"name":"sample","main":"index.js","description":"demo"}"#,
        )
        .unwrap();
        dir
    }

    #[tokio::test]
    async fn test_status_of_never_started_project() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        app.register(sample_project(dir.path())).await.unwrap();

        assert_eq!(app.status("sample").await.unwrap(), RuntimeState::default());
        assert_eq!(app.status_all().await.unwrap()["sample"].pid, 0);
        assert!(matches!(
            app.status("ghost").await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_start_stop_remove_flow() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        app.register(sample_project(dir.path())).await.unwrap();
        let mut events = app.subscribe();

        let started = app.start("sample", 0).await.unwrap();
        assert!(started.is_running());
        assert!(matches!(
            app.remove("sample").await,
            Err(DomainError::ProjectRunning(_))
        ));

        app.stop("sample").await.unwrap();
        loop {
            let event = events.recv().await.unwrap();
            if event.state.pid == 0 {
                break;
            }
        }

        app.remove("sample").await.unwrap();
        assert!(app.list().await.unwrap().is_empty());
        assert!(matches!(
            app.status("sample").await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_launcher_standalone() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        app.register(sample_project(dir.path())).await.unwrap();

        let path = app.generate_launcher("sample", 2).await.unwrap();
        assert!(path.ends_with("bpm_cluster_launcher.js"));
        assert_eq!(
            app.generate_launcher("sample", 0).await.unwrap_err(),
            DomainError::InvalidInstanceCount
        );
        assert_eq!(app.get("sample").await.unwrap().description(), Some("demo"));
    }

    #[tokio::test]
    async fn test_closed_application_reports_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        app.close().await.unwrap();

        assert!(matches!(app.list().await, Err(DomainError::Storage(_))));
    }
}
