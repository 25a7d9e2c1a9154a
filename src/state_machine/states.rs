use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle states of one order-resolution process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionState {
    /// Initial state; the case file is being assembled
    #[default]
    Building,
    /// Automated transfer retries are in progress
    Retrying,
    /// Escalated to a human and suspended at the decision gate
    AwaitingDecision,
    /// A terminal outcome has been produced
    Resolved,
}

impl ResolutionState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved)
    }

    /// Check if the process is suspended waiting for an external verdict
    pub fn is_waiting(&self) -> bool {
        matches!(self, Self::AwaitingDecision)
    }
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Building => write!(f, "building"),
            Self::Retrying => write!(f, "retrying"),
            Self::AwaitingDecision => write!(f, "awaiting_decision"),
            Self::Resolved => write!(f, "resolved"),
        }
    }
}

impl std::str::FromStr for ResolutionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "building" => Ok(Self::Building),
            "retrying" => Ok(Self::Retrying),
            "awaiting_decision" => Ok(Self::AwaitingDecision),
            "resolved" => Ok(Self::Resolved),
            _ => Err(format!("Invalid resolution state: {s}")),
        }
    }
}

/// Terminal business outcome of a resolution process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionOutcome {
    /// Automated remediation succeeded
    ResolvedAutomatically,
    /// A human approved the escalation
    EscalatedApproved,
    /// A human rejected the escalation, or never answered before the deadline
    PendingManualReview,
    /// No remediation exists for the issue type and the case was rejected
    EscalatedRejected,
}

impl ResolutionOutcome {
    /// Whether a human was involved in reaching this outcome
    pub fn was_escalated(&self) -> bool {
        !matches!(self, Self::ResolvedAutomatically)
    }
}

impl fmt::Display for ResolutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResolvedAutomatically => write!(f, "RESOLVED_AUTOMATICALLY"),
            Self::EscalatedApproved => write!(f, "ESCALATED_APPROVED"),
            Self::PendingManualReview => write!(f, "PENDING_MANUAL_REVIEW"),
            Self::EscalatedRejected => write!(f, "ESCALATED_REJECTED"),
        }
    }
}

impl std::str::FromStr for ResolutionOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RESOLVED_AUTOMATICALLY" => Ok(Self::ResolvedAutomatically),
            "ESCALATED_APPROVED" => Ok(Self::EscalatedApproved),
            "PENDING_MANUAL_REVIEW" => Ok(Self::PendingManualReview),
            "ESCALATED_REJECTED" => Ok(Self::EscalatedRejected),
            _ => Err(format!("Invalid resolution outcome: {s}")),
        }
    }
}
