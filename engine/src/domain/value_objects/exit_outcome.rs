//! Exit outcome value object
//! How a supervised process terminated, and what that means for restarts

use std::fmt;

/// Signal number sent by Stop
pub const SIGKILL: i32 = 9;

/// Raw termination reported by the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Normal exit with a status code
    Exited(i32),
    /// Terminated by a signal
    Signaled(i32),
}

/// Decision taken after an exit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitClassification {
    /// Exit status 0
    Clean,
    /// Killed by Stop (SIGKILL) or a stop was requested
    Stopped,
    /// Anything else, restarted
    Crashed,
}

impl ExitOutcome {
    pub fn classify(&self, stop_requested: bool) -> ExitClassification {
        if stop_requested {
            return ExitClassification::Stopped;
        }
        match *self {
            ExitOutcome::Exited(0) => ExitClassification::Clean,
            ExitOutcome::Signaled(SIGKILL) => ExitClassification::Stopped,
            _ => ExitClassification::Crashed,
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Exited(code) => write!(f, "exit status {}", code),
            ExitOutcome::Signaled(sig) => write!(f, "signal {}", sig),
        }
    }
}

impl ExitClassification {
    pub fn should_restart(&self) -> bool {
        matches!(self, ExitClassification::Crashed)
    }
}
