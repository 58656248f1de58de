//! Tokio Process Executor
//! Real implementation of the ProcessExecutor port using tokio
//!
//! Children are spawned as leaders of their own process group so that a
//! single `killpg` reaches every worker they fork.

use crate::domain::{
    ports::{ProcessExecutor, ProcessExitHandle, SpawnResult, SpawnSpec},
    DomainError, ExitOutcome,
};
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tracing::{debug, error, info, warn};

#[cfg(unix)]
use nix::{
    errno::Errno,
    sys::signal::{self, killpg, Signal},
    unistd::Pid,
};

/// Tokio-based process executor
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessExecutor;

impl TokioProcessExecutor {
    pub fn new() -> Self {
        Self
    }

    fn open_log(spec: &SpawnSpec) -> Result<File, DomainError> {
        let mut options = OpenOptions::new();
        options.create(true);
        if spec.append_log {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        options.open(&spec.log_path).map_err(|e| {
            DomainError::Io(format!(
                "cannot open log file {}: {}",
                spec.log_path.display(),
                e
            ))
        })
    }

    fn exit_outcome(status: ExitStatus) -> ExitOutcome {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(sig) = status.signal() {
                return ExitOutcome::Signaled(sig);
            }
        }
        ExitOutcome::Exited(status.code().unwrap_or(-1))
    }

    /// Drive `child` to completion on its own task and hand back a future for the outcome
    fn create_exit_handle(mut child: Child, pid: u32) -> ProcessExitHandle {
        let (tx, rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            let result = match child.wait().await {
                Ok(status) => {
                    let outcome = Self::exit_outcome(status);
                    debug!(pid = pid, outcome = %outcome, "Process exited");
                    Ok(outcome)
                }
                Err(e) => {
                    error!(pid = pid, error = %e, "Failed to wait for process");
                    Err(DomainError::Io(format!("failed to wait for process: {}", e)))
                }
            };
            let _ = tx.send(result);
        });

        Box::pin(async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => Err(DomainError::Io(
                    "process monitor task died unexpectedly".to_string(),
                )),
            }
        })
    }
}

#[async_trait]
impl ProcessExecutor for TokioProcessExecutor {
    async fn spawn(&self, spec: SpawnSpec) -> Result<SpawnResult, DomainError> {
        info!(
            program = %spec.program,
            args = ?spec.args,
            working_dir = %spec.working_dir.display(),
            log = %spec.log_path.display(),
            "Spawning process"
        );

        let log = Self::open_log(&spec)?;
        let log_err = log.try_clone()?;

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .current_dir(&spec.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            // children outlive the daemon unless stopped explicitly
            .kill_on_drop(false);

        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|e| {
            error!(program = %spec.program, error = %e, "Failed to spawn process");
            DomainError::Io(format!("{}: {}", spec.program, e))
        })?;

        let pid = child
            .id()
            .ok_or_else(|| DomainError::Io("process exited before its PID was read".to_string()))?;

        info!(pid = pid, "Process spawned successfully");

        Ok(SpawnResult {
            pid,
            exit_handle: Self::create_exit_handle(child, pid),
        })
    }

    async fn kill_group(&self, pid: u32) -> Result<(), DomainError> {
        #[cfg(unix)]
        {
            let raw = i32::try_from(pid)
                .map_err(|_| DomainError::Io(format!("invalid pid {}", pid)))?;
            info!(pid = pid, "Sending SIGKILL to process group");

            match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
                Ok(()) => Ok(()),
                Err(Errno::ESRCH) => {
                    warn!(pid = pid, "Process group already gone");
                    Ok(())
                }
                Err(e) => Err(DomainError::Io(format!(
                    "failed to kill process group {}: {}",
                    pid, e
                ))),
            }
        }

        #[cfg(not(unix))]
        {
            Err(DomainError::Io(format!(
                "process group kill not supported on this platform (pid {})",
                pid
            )))
        }
    }

    async fn is_alive(&self, pid: u32) -> bool {
        if pid == 0 {
            return false;
        }

        #[cfg(unix)]
        {
            match i32::try_from(pid) {
                Ok(raw) => signal::kill(Pid::from_raw(raw), None).is_ok(),
                Err(_) => false,
            }
        }

        #[cfg(not(unix))]
        {
            false
        }
    }
}
