//! # System Constants
//!
//! Core constants that define the operational boundaries of the order
//! resolution process: identity prefixes, audit kinds, lifecycle event
//! names and default limits.

/// Prefix of every process identity. The full identity is `resolve-<orderID>`.
pub const PROCESS_ID_PREFIX: &str = "resolve-";

/// Prefix of every escalation task id. The full id is `task-<orderID>`.
pub const TASK_ID_PREFIX: &str = "task-";

/// Default number of business retry attempts before escalation
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;

/// Upper bound accepted by configuration validation for business attempts
pub const MAX_RETRY_ATTEMPTS_LIMIT: u32 = 10;

/// Longest decision gate deadline accepted by configuration validation (one year)
pub const MAX_GATE_TIMEOUT_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Default capacity of the lifecycle event broadcast channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Human task types
pub mod task_types {
    pub const RETRY_TRANSFER: &str = "RETRY_TRANSFER";
    pub const MANUAL_REVIEW: &str = "MANUAL_REVIEW";
}

/// Names of the external actions invoked through the substrate
pub mod actions {
    pub const BUILD_CASE_FILE: &str = "BuildCaseFile";
    pub const RETRY_TRANSFER: &str = "RetryTransfer";
}

/// Lifecycle events published on every live state transition
pub mod events {
    pub const PROCESS_STARTED: &str = "resolution.process_started";
    pub const CASEFILE_BUILT: &str = "resolution.casefile_built";
    pub const RETRY_ATTEMPTED: &str = "resolution.retry_attempted";
    pub const TASK_CREATED: &str = "resolution.task_created";
    pub const DECISION_RECEIVED: &str = "resolution.decision_received";
    pub const DECISION_TIMED_OUT: &str = "resolution.decision_timed_out";
    pub const RESOLVED: &str = "resolution.resolved";
    pub const PROCESS_FAILED: &str = "resolution.process_failed";
}

/// Build the process identity for an order
pub fn process_id_for(order_id: &str) -> String {
    format!("{PROCESS_ID_PREFIX}{order_id}")
}

/// Build the deterministic escalation task id for an order
pub fn task_id_for(order_id: &str) -> String {
    format!("{TASK_ID_PREFIX}{order_id}")
}
