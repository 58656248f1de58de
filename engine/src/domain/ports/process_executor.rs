//! ProcessExecutor port
//! Interface for spawning, killing and probing OS processes

use crate::domain::{DomainError, ExitOutcome};
use async_trait::async_trait;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

/// What to launch and where its output goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// stdout and stderr are both redirected here
    pub log_path: PathBuf,
    /// Append to the log instead of truncating it
    pub append_log: bool,
}

/// Handle for monitoring process exit
/// Resolves once the child has terminated
pub type ProcessExitHandle = Pin<Box<dyn Future<Output = Result<ExitOutcome, DomainError>> + Send>>;

/// Result of spawning a process
pub struct SpawnResult {
    pub pid: u32,
    pub exit_handle: ProcessExitHandle,
}

impl std::fmt::Debug for SpawnResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnResult")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

/// Port for executing system processes
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Spawn a new process as the leader of its own process group
    async fn spawn(&self, spec: SpawnSpec) -> Result<SpawnResult, DomainError>;

    /// SIGKILL the whole process group led by `pid`
    async fn kill_group(&self, pid: u32) -> Result<(), DomainError>;

    /// Zero-effect existence probe. Any probe error counts as not alive; PID 0 is never alive.
    async fn is_alive(&self, pid: u32) -> bool;
}
