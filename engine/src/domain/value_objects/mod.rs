pub mod exit_outcome;
pub mod restart_backoff;
pub mod runtime_state;

pub use exit_outcome::{ExitClassification, ExitOutcome, SIGKILL};
pub use restart_backoff::RestartBackoff;
pub use runtime_state::RuntimeState;
