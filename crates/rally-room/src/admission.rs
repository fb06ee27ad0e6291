//! Score plausibility check.

use std::time::Duration;

use crate::AdmissionConfig;

/// Rejects scores that could not have been earned in the elapsed time.
#[derive(Debug, Clone)]
pub struct AdmissionGuard {
    config: AdmissionConfig,
}

impl AdmissionGuard {
    pub fn new(config: AdmissionConfig) -> Self {
        Self { config }
    }

    /// Highest score accepted `elapsed` after the match started.
    pub fn ceiling(&self, elapsed: Duration) -> f64 {
        let secs = elapsed.max(self.config.min_elapsed).as_secs_f64();
        self.config.max_rate_per_sec * secs * self.config.tolerance
    }

    /// `Ok` if `score` is plausible, otherwise the ceiling it broke.
    pub fn check(&self, score: u64, elapsed: Duration) -> Result<(), u64> {
        let ceiling = self.ceiling(elapsed);
        if score as f64 > ceiling {
            Err(ceiling as u64)
        } else {
            Ok(())
        }
    }
}

impl Default for AdmissionGuard {
    fn default() -> Self {
        Self::new(AdmissionConfig::default())
    }
}
