use super::states::ResolutionOutcome;
use crate::constants::events;
use crate::models::{CaseFile, HumanTask, TaskDecision, TransferStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recorded events that drive resolution state transitions.
///
/// A process state is fully reconstructable by applying its recorded
/// events, in order, to a fresh state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ResolutionEvent {
    /// The case-file builder returned a snapshot
    CaseFileBuilt {
        case_file: CaseFile,
        at: DateTime<Utc>,
    },
    /// One business retry attempt completed
    RetryAttempted {
        attempt: u32,
        status: TransferStatus,
        at: DateTime<Utc>,
    },
    /// Automated remediation was exhausted and a human task was opened
    TaskCreated { task: HumanTask },
    /// A decision matching the pending task was accepted by the gate
    DecisionReceived {
        decision: TaskDecision,
        at: DateTime<Utc>,
    },
    /// The gate deadline passed without a matching decision
    DecisionTimedOut {
        task_id: String,
        at: DateTime<Utc>,
    },
    /// The process reached its terminal outcome
    Resolved {
        outcome: ResolutionOutcome,
        at: DateTime<Utc>,
    },
}

impl ResolutionEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CaseFileBuilt { .. } => "casefile_built",
            Self::RetryAttempted { .. } => "retry_attempted",
            Self::TaskCreated { .. } => "task_created",
            Self::DecisionReceived { .. } => "decision_received",
            Self::DecisionTimedOut { .. } => "decision_timed_out",
            Self::Resolved { .. } => "resolved",
        }
    }

    /// Lifecycle event name published when this event is applied live
    pub fn lifecycle_event_name(&self) -> &'static str {
        match self {
            Self::CaseFileBuilt { .. } => events::CASEFILE_BUILT,
            Self::RetryAttempted { .. } => events::RETRY_ATTEMPTED,
            Self::TaskCreated { .. } => events::TASK_CREATED,
            Self::DecisionReceived { .. } => events::DECISION_RECEIVED,
            Self::DecisionTimedOut { .. } => events::DECISION_TIMED_OUT,
            Self::Resolved { .. } => events::RESOLVED,
        }
    }

    /// Logical time at which the event was applied
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::CaseFileBuilt { at, .. }
            | Self::RetryAttempted { at, .. }
            | Self::DecisionReceived { at, .. }
            | Self::DecisionTimedOut { at, .. }
            | Self::Resolved { at, .. } => *at,
            Self::TaskCreated { task } => task.created_at,
        }
    }

    /// Check if this event represents a terminal transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}
