//! Domain-level errors
//! Business rule violations plus the storage and I/O failures surfaced to callers

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    // Lookup errors
    #[error("Project '{0}' not found")]
    NotFound(String),

    // Registration errors
    #[error("Manifest not found or unreadable at '{0}'")]
    ManifestMissing(String),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Project '{0}' has no entry point")]
    NoEntryPoint(String),

    // Lifecycle errors
    #[error("Project '{name}' is already running (PID: {pid})")]
    AlreadyRunning { name: String, pid: u32 },

    #[error("Project '{0}' is not running")]
    NotRunning(String),

    #[error("Project '{0}' is running and cannot be removed")]
    ProjectRunning(String),

    #[error("Failed to spawn project '{name}': {reason}")]
    SpawnFailed { name: String, reason: String },

    // Log errors
    #[error("Log for project '{0}' has not been created")]
    LogNotCreated(String),

    // Launcher errors
    #[error("Instance count must be greater than zero")]
    InvalidInstanceCount,

    // Infrastructure failures
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Storage(format!("serialization failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
