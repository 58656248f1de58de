//! Process Supervisor Service
//! Spawns projects, owns their monitor tasks, classifies exits and restarts crashes
//!
//! Each successful Start begins a run chain: one monitor task that waits for
//! the child to exit, records the exit, and re-launches the project in the
//! same task while exits keep being classified as crashes. Stop cancels the
//! chain's token before killing the process group, so the monitor sees the
//! stop request when the exit arrives.

use crate::constants::launch::{
    CLUSTER_LAUNCHER_FILE, DEFAULT_INTERPRETER, DEFAULT_LOG_DIR, LOG_FILE_EXTENSION,
};
use crate::constants::STATE_EVENT_CAPACITY;
use crate::domain::ports::{ProcessExecutor, SpawnResult, SpawnSpec};
use crate::domain::services::{ClusterLauncher, ProjectGuard, ProjectRegistry, RuntimeStateStore};
use crate::domain::{DomainError, Project, RestartBackoff, RuntimeState};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Engine-side supervisor settings
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Program that runs the entry point (`<interpreter> <entry>`)
    pub interpreter: String,
    /// Directory holding one captured-output file per project
    pub log_dir: PathBuf,
    pub backoff: RestartBackoff,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.to_string(),
            log_dir: std::env::temp_dir().join(DEFAULT_LOG_DIR),
            backoff: RestartBackoff::default(),
        }
    }
}

impl SupervisorConfig {
    pub fn log_path_for(&self, name: &str) -> PathBuf {
        self.log_dir
            .join(format!("{}.{}", encode_log_name(name), LOG_FILE_EXTENSION))
    }
}

/// Percent-encode every byte outside `[A-Za-z0-9._-]`, so distinct names map to distinct files
pub fn encode_log_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
            out.push(byte as char);
        } else {
            let _ = write!(out, "%{:02X}", byte);
        }
    }
    out
}

/// Published on every runtime state write made by the supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEvent {
    pub name: String,
    pub state: RuntimeState,
}

struct RunChain {
    id: u64,
    token: CancellationToken,
}

#[derive(Clone)]
pub struct ProcessSupervisionService {
    registry: Arc<ProjectRegistry>,
    states: Arc<RuntimeStateStore>,
    executor: Arc<dyn ProcessExecutor>,
    launcher: ClusterLauncher,
    config: Arc<SupervisorConfig>,
    chains: Arc<Mutex<HashMap<String, RunChain>>>,
    next_chain_id: Arc<AtomicU64>,
    events: broadcast::Sender<StateEvent>,
}

impl ProcessSupervisionService {
    pub fn new(
        registry: Arc<ProjectRegistry>,
        states: Arc<RuntimeStateStore>,
        executor: Arc<dyn ProcessExecutor>,
        config: SupervisorConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(STATE_EVENT_CAPACITY);
        Self {
            registry,
            states,
            executor,
            launcher: ClusterLauncher::new(),
            config: Arc::new(config),
            chains: Arc::new(Mutex::new(HashMap::new())),
            next_chain_id: Arc::new(AtomicU64::new(1)),
            events,
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Observe every spawn and exit write
    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.events.subscribe()
    }

    /// Start a project. `instances > 0` launches it through the cluster launcher.
    ///
    /// Returns once the process is spawned and its state persisted.
    pub async fn start(&self, name: &str, instances: u32) -> Result<RuntimeState, DomainError> {
        // descriptor read under the lock so a concurrent Remove cannot be outrun
        let guard = self.states.lock(name).await;
        let project = self.registry.get(name).await?;

        if let Some(state) = self.states.get_locked(&guard).await? {
            if state.is_running() {
                return Err(DomainError::AlreadyRunning {
                    name: name.to_string(),
                    pid: state.pid,
                });
            }
        }
        if project.entry_point().trim().is_empty() {
            return Err(DomainError::NoEntryPoint(name.to_string()));
        }

        let (spawned, state) = self.launch(&guard, &project, instances, false).await?;
        let (chain_id, token) = self.begin_chain(name).await;

        let supervisor = self.clone();
        let name = name.to_string();
        tokio::spawn(async move {
            supervisor
                .monitor(name, instances, chain_id, token, spawned)
                .await;
        });

        drop(guard);
        Ok(state)
    }

    /// Kill a running project's process group. The monitor records the exit.
    ///
    /// Issued while a crash restart is pending, it cancels the restart instead.
    pub async fn stop(&self, name: &str) -> Result<(), DomainError> {
        let guard = self.states.lock(name).await;
        let state = self
            .states
            .get_locked(&guard)
            .await?
            .ok_or_else(|| DomainError::NotFound(name.to_string()))?;

        let chain = self
            .chains
            .lock()
            .await
            .get(name)
            .map(|chain| chain.token.clone());

        if !state.is_running() {
            return match chain {
                Some(token) => {
                    token.cancel();
                    info!(project = %name, "Pending restart cancelled");
                    Ok(())
                }
                None => Err(DomainError::NotRunning(name.to_string())),
            };
        }

        info!(project = %name, pid = state.pid, "Stopping project");
        self.executor.kill_group(state.pid).await?;

        // still under the lock, so the monitor sees this before classifying the exit
        if let Some(token) = chain {
            token.cancel();
        }
        drop(guard);
        Ok(())
    }

    /// Reconciled state; `NotFound` if the project was never started
    pub async fn status(&self, name: &str) -> Result<RuntimeState, DomainError> {
        self.states.get(name).await
    }

    pub async fn status_all(&self) -> Result<BTreeMap<String, RuntimeState>, DomainError> {
        self.states.list_all().await
    }

    /// Cancel all run chains and kill every running project
    pub async fn shutdown(&self) {
        for chain in self.chains.lock().await.values() {
            chain.token.cancel();
        }

        let all = match self.states.list_all().await {
            Ok(all) => all,
            Err(e) => {
                error!(error = %e, "Failed to list projects during shutdown");
                return;
            }
        };

        for (name, state) in all.into_iter().filter(|(_, s)| s.is_running()) {
            match self.stop(&name).await {
                Ok(()) | Err(DomainError::NotRunning(_)) => {}
                Err(e) => warn!(project = %name, error = %e, "Failed to stop project on shutdown"),
            }
            debug!(project = %name, pid = state.pid, "Stopped on shutdown");
        }
    }

    async fn launch(
        &self,
        guard: &ProjectGuard,
        project: &Project,
        instances: u32,
        append_log: bool,
    ) -> Result<(SpawnResult, RuntimeState), DomainError> {
        let name = guard.name();

        let target = if instances > 0 {
            self.launcher
                .generate(project.working_dir(), project.entry_point(), instances)
                .await?;
            CLUSTER_LAUNCHER_FILE.to_string()
        } else {
            project.entry_point().to_string()
        };

        tokio::fs::create_dir_all(&self.config.log_dir).await?;
        let log_path = self.config.log_path_for(name);

        let spec = SpawnSpec {
            program: self.config.interpreter.clone(),
            args: vec![target],
            working_dir: project.working_dir().to_path_buf(),
            log_path: log_path.clone(),
            append_log,
        };

        let spawned = self
            .executor
            .spawn(spec)
            .await
            .map_err(|e| DomainError::SpawnFailed {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        let state = RuntimeState::started(spawned.pid, log_path, Utc::now());
        if let Err(e) = self.states.put_locked(guard, &state).await {
            error!(
                project = %name,
                pid = spawned.pid,
                error = %e,
                "Failed to persist start, killing process"
            );
            let _ = self.executor.kill_group(spawned.pid).await;
            return Err(e);
        }
        self.publish(name, &state);

        info!(
            project = %name,
            pid = spawned.pid,
            instances = instances,
            "Project started"
        );
        Ok((spawned, state))
    }

    async fn monitor(
        self,
        name: String,
        instances: u32,
        chain_id: u64,
        token: CancellationToken,
        mut spawned: SpawnResult,
    ) {
        let mut crashes: u32 = 0;

        loop {
            let pid = spawned.pid;
            let started = Instant::now();
            let outcome = spawned.exit_handle.await;
            let ran_for = started.elapsed();

            let guard = self.states.lock(&name).await;
            self.record_exit(&guard, pid).await;

            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(project = %name, pid = pid, error = %e, "Lost track of process exit");
                    self.end_chain(&name, chain_id).await;
                    return;
                }
            };

            let classification = outcome.classify(token.is_cancelled());
            if !classification.should_restart() {
                info!(
                    project = %name,
                    pid = pid,
                    outcome = %outcome,
                    classification = ?classification,
                    "Project exited"
                );
                self.end_chain(&name, chain_id).await;
                return;
            }

            crashes = if self.config.backoff.resets_after(ran_for) {
                1
            } else {
                crashes.saturating_add(1)
            };
            let delay = self.config.backoff.delay_for(crashes);
            warn!(
                project = %name,
                pid = pid,
                outcome = %outcome,
                consecutive_crashes = crashes,
                delay_ms = delay.as_millis() as u64,
                "Project crashed, restarting"
            );

            let guard = if delay.is_zero() {
                guard
            } else {
                drop(guard);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = token.cancelled() => {
                        debug!(project = %name, "Restart backoff interrupted by stop");
                        self.end_chain(&name, chain_id).await;
                        return;
                    }
                }
                self.states.lock(&name).await
            };

            match self.relaunch(&guard, instances, chain_id, &token).await {
                Ok(Some(next)) => spawned = next,
                Ok(None) => {
                    debug!(project = %name, "Run chain superseded, not restarting");
                    self.end_chain(&name, chain_id).await;
                    return;
                }
                Err(e) => {
                    error!(project = %name, error = %e, "Failed to restart crashed project");
                    self.end_chain(&name, chain_id).await;
                    return;
                }
            }
        }
    }

    /// Launch the next run of a chain, unless the chain was stopped or replaced
    async fn relaunch(
        &self,
        guard: &ProjectGuard,
        instances: u32,
        chain_id: u64,
        token: &CancellationToken,
    ) -> Result<Option<SpawnResult>, DomainError> {
        if token.is_cancelled() || !self.owns_chain(guard.name(), chain_id).await {
            return Ok(None);
        }

        let project = match self.registry.get(guard.name()).await {
            Ok(project) => project,
            Err(DomainError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        if let Some(state) = self.states.get_locked(guard).await? {
            if state.is_running() {
                return Ok(None);
            }
        }

        let (spawned, _) = self.launch(guard, &project, instances, true).await?;
        Ok(Some(spawned))
    }

    /// Persist the exit of `pid` unless a later write already replaced it
    async fn record_exit(&self, guard: &ProjectGuard, pid: u32) {
        match self.states.load_locked(guard).await {
            Ok(Some(state)) if state.pid == pid => {
                let exited = state.exited(Utc::now());
                match self.states.put_locked(guard, &exited).await {
                    Ok(()) => self.publish(guard.name(), &exited),
                    Err(e) => {
                        error!(
                            project = %guard.name(),
                            pid = pid,
                            error = %e,
                            "Failed to persist exit"
                        )
                    }
                }
            }
            Ok(_) => debug!(project = %guard.name(), pid = pid, "Exit already recorded"),
            Err(e) => error!(project = %guard.name(), error = %e, "Failed to load state on exit"),
        }
    }

    fn publish(&self, name: &str, state: &RuntimeState) {
        // no subscribers is fine
        let _ = self.events.send(StateEvent {
            name: name.to_string(),
            state: state.clone(),
        });
    }

    async fn begin_chain(&self, name: &str) -> (u64, CancellationToken) {
        let id = self.next_chain_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let previous = self.chains.lock().await.insert(
            name.to_string(),
            RunChain {
                id,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.token.cancel();
        }
        (id, token)
    }

    async fn end_chain(&self, name: &str, chain_id: u64) {
        let mut chains = self.chains.lock().await;
        if chains.get(name).is_some_and(|chain| chain.id == chain_id) {
            chains.remove(name);
        }
    }

    async fn owns_chain(&self, name: &str, chain_id: u64) -> bool {
        self.chains
            .lock()
            .await
            .get(name)
            .is_some_and(|chain| chain.id == chain_id)
    }
}
