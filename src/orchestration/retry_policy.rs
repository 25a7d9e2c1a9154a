use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Invocation policy for one external action call.
///
/// This governs transport-level retries of a single call (timeouts,
/// transient errors), not the business retry loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRetryPolicy {
    pub start_to_close_timeout: Duration,
    pub initial_interval: Duration,
    pub backoff_coefficient: f64,
    pub maximum_interval: Duration,
    pub maximum_attempts: u32,
}

impl ActionRetryPolicy {
    /// Delay before the next call after `attempt` (1-based) failed:
    /// `initial_interval * backoff_coefficient^(attempt - 1)`, capped at
    /// `maximum_interval`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_secs =
            self.initial_interval.as_secs_f64() * self.backoff_coefficient.powi(exponent);
        let max_secs = self.maximum_interval.as_secs_f64();

        if !delay_secs.is_finite() || delay_secs >= max_secs {
            self.maximum_interval
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }

    /// Whether another call may be made after `attempt` calls failed
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.maximum_attempts
    }
}

impl Default for ActionRetryPolicy {
    fn default() -> Self {
        crate::config::ActivityConfig::default().retry_policy()
    }
}
