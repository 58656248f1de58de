pub mod process_executor;
pub mod state_store;

pub use process_executor::{ProcessExecutor, ProcessExitHandle, SpawnResult, SpawnSpec};
pub use state_store::StateStore;
