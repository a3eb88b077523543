//! Exponential backoff.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, RelayResult};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 0.3;

/// Calculate the delay before retry number `attempt + 1`.
///
/// `attempt` counts from zero, so the first retry waits `backoff_factor`
/// seconds and each later one doubles it.
pub fn calculate_backoff(attempt: u32, backoff_factor: f64) -> Duration {
    let exponent = attempt.min(63) as i32;
    let secs = backoff_factor * 2f64.powi(exponent);
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// Retry budget for one call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_factor: f64) -> RelayResult<Self> {
        let policy = Self {
            max_retries,
            backoff_factor,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> RelayResult<()> {
        if !self.backoff_factor.is_finite() || self.backoff_factor <= 0.0 {
            return Err(RelayError::Validation(format!(
                "backoff_factor must be a positive number, got {}",
                self.backoff_factor
            )));
        }
        Ok(())
    }

    /// Total attempts allowed, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.backoff_factor)
    }
}
