//! Application-wide constants and default values
//!
//! Centralizes defaults shared by the engine and the daemon

/// Persistent store layout
pub mod store {
    /// Key prefix of project descriptors
    pub const PROJECT_KEY_PREFIX: &str = "project-";

    /// Key prefix of runtime states
    pub const STATE_KEY_PREFIX: &str = "state-";

    /// Database file name under the temp directory
    pub const DEFAULT_DB_FILE: &str = "bulk-pm.db";
}

/// Process launch defaults
pub mod launch {
    /// Interpreter used to run a project's entry point
    pub const DEFAULT_INTERPRETER: &str = "node";

    /// Manifest read from a project's working directory
    pub const MANIFEST_FILE: &str = "package.json";

    /// Launcher script written for multi-instance starts
    pub const CLUSTER_LAUNCHER_FILE: &str = "bpm_cluster_launcher.js";

    /// Log directory name under the temp directory
    pub const DEFAULT_LOG_DIR: &str = "bulk-pm-logs";

    /// Extension of captured output files
    pub const LOG_FILE_EXTENSION: &str = "log";
}

/// Crash restart defaults
pub mod restart {
    /// Delay before the first restart (milliseconds). 0 restarts immediately.
    pub const DEFAULT_INITIAL_DELAY_MS: u64 = 0;

    /// Upper bound of the exponential restart delay (milliseconds)
    pub const DEFAULT_MAX_DELAY_MS: u64 = 60_000;

    /// A run lasting at least this long resets the crash counter (seconds)
    pub const DEFAULT_RESET_AFTER_SECS: u64 = 10;

    /// Exponential backoff base
    pub const BACKOFF_BASE: u32 = 2;
}

/// Control API defaults
pub mod api {
    pub const DEFAULT_PORT: u16 = 9663;
    pub const DEFAULT_BIND: &str = "127.0.0.1";

    /// Lines returned by the log endpoint when none are requested
    pub const DEFAULT_LOG_LINES: usize = 10;
}

/// Capacity of the state event broadcast channel
pub const STATE_EVENT_CAPACITY: usize = 256;
