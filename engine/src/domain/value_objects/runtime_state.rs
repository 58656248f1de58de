//! Runtime state value object
//! Last known OS-level state of a project

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted runtime state. `pid == 0` means not running.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeState {
    pub pid: u32,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub log_path: Option<PathBuf>,
}

impl RuntimeState {
    /// State written right after a successful spawn
    pub fn started(pid: u32, log_path: impl Into<PathBuf>, now: DateTime<Utc>) -> Self {
        Self {
            pid,
            start_time: Some(now),
            end_time: None,
            log_path: Some(log_path.into()),
        }
    }

    /// State written once the process is gone. Start time and log path are kept.
    pub fn exited(&self, now: DateTime<Utc>) -> Self {
        Self {
            pid: 0,
            start_time: self.start_time,
            end_time: Some(now),
            log_path: self.log_path.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.pid != 0
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// How long the recorded run lasted, if it has both ends
    pub fn run_duration(&self) -> Option<chrono::Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}
