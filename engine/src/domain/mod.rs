pub mod entities;
pub mod error;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use entities::{Project, ProjectBuilder};
pub use error::{DomainError, Result};
pub use services::{
    ClusterLauncher, LogReader, ProcessSupervisionService, ProjectGuard, ProjectRegistry,
    RuntimeStateStore, StateEvent, SupervisorConfig,
};
pub use value_objects::{ExitClassification, ExitOutcome, RestartBackoff, RuntimeState};
