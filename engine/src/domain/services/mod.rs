pub mod cluster_launcher;
pub mod log_reader;
pub mod manifest;
pub mod process_supervision_service;
pub mod project_registry;
pub mod runtime_state_store;

pub use cluster_launcher::ClusterLauncher;
pub use log_reader::LogReader;
pub use manifest::read_manifest;
pub use process_supervision_service::{
    encode_log_name, ProcessSupervisionService, StateEvent, SupervisorConfig,
};
pub use project_registry::ProjectRegistry;
pub use runtime_state_store::{KeyedLocks, ProjectGuard, RuntimeStateStore};
