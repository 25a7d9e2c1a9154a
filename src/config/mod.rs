//! # Resolution Configuration
//!
//! Typed configuration for order-resolution processes, loaded in layers by
//! [`ConfigManager`]: `config/order-resolution.toml`, then
//! `config/<environment>.toml`, then `ORDER_RESOLUTION__SECTION__KEY`
//! environment variables. Every field has a default, so an empty
//! configuration directory is valid.
//!
//! ```rust,no_run
//! use order_resolution::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let config = manager.config();
//! println!("business attempts: {}", config.retry.max_attempts);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

use crate::constants::{
    DEFAULT_EVENT_CHANNEL_CAPACITY, DEFAULT_MAX_RETRY_ATTEMPTS, MAX_GATE_TIMEOUT_SECONDS,
    MAX_RETRY_ATTEMPTS_LIMIT,
};
use crate::orchestration::retry_policy::ActionRetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ResolutionConfig {
    pub retry: RetryConfig,
    pub activity: ActivityConfig,
    pub decision_gate: DecisionGateConfig,
    pub issues: IssuesConfig,
    pub events: EventsConfig,
}

/// Business retry loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Number of business transfer attempts before escalation
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
        }
    }
}

/// Per-call invocation policy applied by the substrate to every external action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    pub start_to_close_timeout_ms: u64,
    pub initial_interval_ms: u64,
    pub backoff_coefficient: f64,
    pub maximum_interval_ms: u64,
    pub maximum_attempts: u32,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            start_to_close_timeout_ms: 10_000,
            initial_interval_ms: 1_000,
            backoff_coefficient: 2.0,
            maximum_interval_ms: 60_000,
            maximum_attempts: 3,
        }
    }
}

impl ActivityConfig {
    /// Convert to the policy used when invoking actions
    pub fn retry_policy(&self) -> ActionRetryPolicy {
        ActionRetryPolicy {
            start_to_close_timeout: Duration::from_millis(self.start_to_close_timeout_ms),
            initial_interval: Duration::from_millis(self.initial_interval_ms),
            backoff_coefficient: self.backoff_coefficient,
            maximum_interval: Duration::from_millis(self.maximum_interval_ms),
            maximum_attempts: self.maximum_attempts,
        }
    }
}

/// Human decision gate settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DecisionGateConfig {
    /// Deadline measured from task creation; absent means wait indefinitely
    pub timeout_seconds: Option<u64>,
}

impl DecisionGateConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

/// What to do with issue types that have no remediation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnhandledIssuePolicy {
    /// Terminate as `ESCALATED_REJECTED` without remediation
    #[default]
    Reject,
    /// Open a `MANUAL_REVIEW` task and wait at the decision gate
    Escalate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IssuesConfig {
    pub unhandled_policy: UnhandledIssuePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub publisher_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            publisher_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl ResolutionConfig {
    /// Validate configuration for consistency and ranges
    pub fn validate(&self) -> ConfigResult<()> {
        if !(1..=MAX_RETRY_ATTEMPTS_LIMIT).contains(&self.retry.max_attempts) {
            return Err(ConfigurationError::invalid_value(
                "retry.max_attempts",
                self.retry.max_attempts.to_string(),
                format!("must be between 1 and {MAX_RETRY_ATTEMPTS_LIMIT}"),
            ));
        }

        let activity = &self.activity;
        if activity.start_to_close_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "activity.start_to_close_timeout_ms",
                "0",
                "timeout must be greater than 0",
            ));
        }

        if activity.maximum_attempts == 0 {
            return Err(ConfigurationError::invalid_value(
                "activity.maximum_attempts",
                "0",
                "at least one attempt is required",
            ));
        }

        if !activity.backoff_coefficient.is_finite() || activity.backoff_coefficient < 1.0 {
            return Err(ConfigurationError::invalid_value(
                "activity.backoff_coefficient",
                activity.backoff_coefficient.to_string(),
                "coefficient must be a finite number >= 1.0",
            ));
        }

        if activity.maximum_interval_ms < activity.initial_interval_ms {
            return Err(ConfigurationError::invalid_value(
                "activity.maximum_interval_ms",
                activity.maximum_interval_ms.to_string(),
                "maximum interval must not be below the initial interval",
            ));
        }

        match self.decision_gate.timeout_seconds {
            Some(0) => {
                return Err(ConfigurationError::invalid_value(
                    "decision_gate.timeout_seconds",
                    "0",
                    "omit the value to wait indefinitely",
                ));
            }
            Some(seconds) if seconds > MAX_GATE_TIMEOUT_SECONDS => {
                return Err(ConfigurationError::invalid_value(
                    "decision_gate.timeout_seconds",
                    seconds.to_string(),
                    format!("must not exceed {MAX_GATE_TIMEOUT_SECONDS}"),
                ));
            }
            _ => {}
        }

        if self.events.publisher_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "events.publisher_capacity",
                "0",
                "channel capacity must be greater than 0",
            ));
        }

        Ok(())
    }
}
