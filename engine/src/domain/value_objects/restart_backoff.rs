//! Restart backoff policy
//! Delay inserted between consecutive crash restarts

use crate::constants::restart::{
    BACKOFF_BASE, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_DELAY_MS, DEFAULT_RESET_AFTER_SECS,
};
use std::time::Duration;

/// Exponential restart backoff. A zero `initial_delay` restarts immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartBackoff {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub reset_after: Duration,
}

impl Default for RestartBackoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            reset_after: Duration::from_secs(DEFAULT_RESET_AFTER_SECS),
        }
    }
}

impl RestartBackoff {
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Delay before the restart following the `consecutive_crashes`-th crash (1-based)
    pub fn delay_for(&self, consecutive_crashes: u32) -> Duration {
        if self.initial_delay.is_zero() || consecutive_crashes == 0 {
            return Duration::ZERO;
        }

        let factor = BACKOFF_BASE.checked_pow(consecutive_crashes - 1);
        match factor.and_then(|f| self.initial_delay.checked_mul(f)) {
            Some(delay) => delay.min(self.max_delay),
            None => self.max_delay,
        }
    }

    /// Whether a run of this length clears the crash counter
    pub fn resets_after(&self, run: Duration) -> bool {
        run >= self.reset_after
    }
}
