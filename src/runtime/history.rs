use crate::models::TaskDecision;
use crate::state_machine::{ResolutionEvent, ResolutionOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One durable record in a process history.
///
/// The history is the source of truth for a process: replaying it through
/// the workflow reproduces the process state without invoking collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryEvent {
    ProcessStarted {
        process_id: String,
        order_id: String,
        at: DateTime<Utc>,
    },
    /// Final successful result of an external action
    ActionCompleted {
        action: String,
        key: String,
        result: Value,
        attempts: u32,
        at: DateTime<Utc>,
    },
    /// The action failed permanently or exhausted its invocation policy
    ActionFailed {
        action: String,
        key: String,
        reason: String,
        attempts: u32,
        at: DateTime<Utc>,
    },
    /// A decision signal moved from the inbox into the history
    SignalReceived {
        decision: TaskDecision,
        at: DateTime<Utc>,
    },
    /// The decision gate deadline passed
    GateTimerFired {
        task_id: String,
        at: DateTime<Utc>,
    },
    /// A state machine event applied by the workflow
    StateRecorded {
        event: ResolutionEvent,
        at: DateTime<Utc>,
    },
    ProcessCompleted {
        outcome: ResolutionOutcome,
        at: DateTime<Utc>,
    },
    ProcessFailed {
        reason: String,
        at: DateTime<Utc>,
    },
}

impl HistoryEvent {
    /// Logical timestamp stamped when the event was first recorded
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::ProcessStarted { at, .. }
            | Self::ActionCompleted { at, .. }
            | Self::ActionFailed { at, .. }
            | Self::SignalReceived { at, .. }
            | Self::GateTimerFired { at, .. }
            | Self::StateRecorded { at, .. }
            | Self::ProcessCompleted { at, .. }
            | Self::ProcessFailed { at, .. } => *at,
        }
    }

    /// Short description used in nondeterminism reports
    pub fn describe(&self) -> String {
        match self {
            Self::ProcessStarted { process_id, .. } => format!("process_started({process_id})"),
            Self::ActionCompleted { action, key, .. } => format!("action_completed({action}, {key})"),
            Self::ActionFailed { action, key, .. } => format!("action_failed({action}, {key})"),
            Self::SignalReceived { decision, .. } => {
                format!("signal_received({})", decision.task_id)
            }
            Self::GateTimerFired { task_id, .. } => format!("gate_timer_fired({task_id})"),
            Self::StateRecorded { event, .. } => format!("state_recorded({})", event.event_type()),
            Self::ProcessCompleted { outcome, .. } => format!("process_completed({outcome})"),
            Self::ProcessFailed { .. } => "process_failed".to_string(),
        }
    }

    /// Whether the process ended with this event
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ProcessCompleted { .. } | Self::ProcessFailed { .. }
        )
    }
}
