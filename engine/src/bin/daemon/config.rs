//! Daemon configuration from environment variables
//!
//! All configuration is read from environment variables with sensible defaults.

use bpm_engine::constants::{api, launch, restart, store};
use bpm_engine::domain::{RestartBackoff, SupervisorConfig};
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_LOG_LEVEL: &str = "info";

/// Daemon configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// REST port
    pub port: u16,

    /// REST bind address
    pub bind: String,

    /// SQLite database holding descriptors and runtime state
    pub db_path: PathBuf,

    /// Directory of per-project log files
    pub log_dir: PathBuf,

    /// Program that runs project entry points
    pub interpreter: String,

    pub restart_delay_ms: u64,
    pub restart_max_delay_ms: u64,
    pub restart_reset_after_secs: u64,

    /// Kill supervised projects when the daemon exits
    pub stop_on_exit: bool,

    /// Log level
    pub log_level: String,
}

impl DaemonConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let temp = env::temp_dir();
        Self {
            port: Self::parse_num("BPM_PORT").unwrap_or(api::DEFAULT_PORT),
            bind: env::var("BPM_BIND").unwrap_or_else(|_| api::DEFAULT_BIND.to_string()),
            db_path: env::var("BPM_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| temp.join(store::DEFAULT_DB_FILE)),
            log_dir: env::var("BPM_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| temp.join(launch::DEFAULT_LOG_DIR)),
            interpreter: env::var("BPM_INTERPRETER")
                .unwrap_or_else(|_| launch::DEFAULT_INTERPRETER.to_string()),
            restart_delay_ms: Self::parse_num("BPM_RESTART_DELAY_MS")
                .unwrap_or(restart::DEFAULT_INITIAL_DELAY_MS),
            restart_max_delay_ms: Self::parse_num("BPM_RESTART_MAX_DELAY_MS")
                .unwrap_or(restart::DEFAULT_MAX_DELAY_MS),
            restart_reset_after_secs: Self::parse_num("BPM_RESTART_RESET_AFTER_SECS")
                .unwrap_or(restart::DEFAULT_RESET_AFTER_SECS),
            stop_on_exit: Self::parse_bool("BPM_STOP_ON_EXIT", false),
            log_level: Self::parse_log_level(),
        }
    }

    fn parse_num<T: std::str::FromStr>(var_name: &str) -> Option<T> {
        env::var(var_name).ok().and_then(|s| s.trim().parse().ok())
    }

    fn parse_bool(var_name: &str, default: bool) -> bool {
        env::var(var_name)
            .ok()
            .and_then(|s| match s.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            })
            .unwrap_or(default)
    }

    fn parse_log_level() -> String {
        // Priority: BPM_LOG_LEVEL > RUST_LOG > default
        env::var("BPM_LOG_LEVEL")
            .or_else(|_| env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        let ip: IpAddr = self
            .bind
            .parse()
            .map_err(|_| format!("BPM_BIND is not an IP address: {}", self.bind))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            interpreter: self.interpreter.clone(),
            log_dir: self.log_dir.clone(),
            backoff: RestartBackoff {
                initial_delay: Duration::from_millis(self.restart_delay_ms),
                max_delay: Duration::from_millis(self.restart_max_delay_ms),
                reset_after: Duration::from_secs(self.restart_reset_after_secs),
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        self.socket_addr()?;
        if self.interpreter.trim().is_empty() {
            return Err("BPM_INTERPRETER cannot be empty".to_string());
        }
        if self.restart_max_delay_ms < self.restart_delay_ms {
            return Err(
                "BPM_RESTART_MAX_DELAY_MS must not be lower than BPM_RESTART_DELAY_MS".to_string(),
            );
        }
        Ok(())
    }
}
