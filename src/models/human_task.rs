use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An escalation awaiting a human decision.
///
/// Exists only when automated remediation was exhausted without resolving
/// the order. The `id` is derived from the order id, so a replayed process
/// produces the same task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HumanTask {
    pub id: String,
    pub order_id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub title: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// An external verdict on a human task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDecision {
    pub task_id: String,
    pub approved: bool,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub decider: String,
    pub decided_at: DateTime<Utc>,
}

impl TaskDecision {
    /// Whether this decision addresses the given task
    pub fn matches(&self, task: &HumanTask) -> bool {
        self.task_id == task.id
    }
}
