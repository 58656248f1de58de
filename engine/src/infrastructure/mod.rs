//! Infrastructure Layer - Driven Adapters
//! Implementations of domain ports

pub mod in_memory_store;
pub mod sqlite_store;
pub mod tokio_executor;

pub use in_memory_store::InMemoryStateStore;
pub use sqlite_store::SqliteStateStore;
pub use tokio_executor::TokioProcessExecutor;
