use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of lifecycle record written to the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditKind {
    CasefileBuilt,
    RetryTransfer,
    TaskCreated,
    DecisionReceived,
    DecisionTimedOut,
    Resolved,
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CasefileBuilt => write!(f, "CASEFILE_BUILT"),
            Self::RetryTransfer => write!(f, "RETRY_TRANSFER"),
            Self::TaskCreated => write!(f, "TASK_CREATED"),
            Self::DecisionReceived => write!(f, "DECISION_RECEIVED"),
            Self::DecisionTimedOut => write!(f, "DECISION_TIMED_OUT"),
            Self::Resolved => write!(f, "RESOLVED"),
        }
    }
}

/// One immutable lifecycle record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub at: DateTime<Utc>,
    pub kind: AuditKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl AuditEvent {
    pub fn new(at: DateTime<Utc>, kind: AuditKind, message: impl Into<String>, data: Value) -> Self {
        Self {
            at,
            kind,
            message: message.into(),
            data,
        }
    }
}

/// Append-only, ordered sequence of audit events.
///
/// Entries can only be appended; none are ever removed or reordered.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLog {
    entries: Vec<AuditEvent>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: AuditEvent) {
        self.entries.push(event);
    }

    pub fn entries(&self) -> &[AuditEvent] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Kinds in application order, handy for assertions and summaries
    pub fn kinds(&self) -> Vec<AuditKind> {
        self.entries.iter().map(|e| e.kind).collect()
    }

    pub fn last(&self) -> Option<&AuditEvent> {
        self.entries.last()
    }
}
