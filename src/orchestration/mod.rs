//! # Resolution Orchestration
//!
//! Business logic of the broken-order workflow, written against
//! [`ProcessContext`](crate::runtime::ProcessContext) so that it runs the
//! same way live and under replay.
//!
//! ## Core Components
//!
//! - **ResolveBrokenOrder**: builds the case file, dispatches on issue type, records the outcome
//! - **StrategyRegistry**: remediation strategies keyed by issue type, with a configurable default
//! - **RetryController**: bounded business retry loop against the transfer service
//! - **HumanDecisionGate**: opens the human task and suspends until a matching decision or deadline
//! - **ActionRetryPolicy**: per-call timeout and exponential backoff applied by the runtime

pub mod decision_gate;
pub mod resolution_workflow;
pub mod retry_controller;
pub mod retry_policy;
pub mod strategy;

pub use decision_gate::{GateVerdict, HumanDecisionGate};
pub use resolution_workflow::ResolveBrokenOrder;
pub use retry_controller::{RetryController, RetryOutcome};
pub use retry_policy::ActionRetryPolicy;
pub use strategy::{
    IssueStrategy, StrategyRegistry, TransferFailedStrategy, UnhandledIssueStrategy,
};
