use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of the broken-order condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    /// Funds transfer to the seller was not accepted
    #[default]
    TransferFailed,
    /// Buyer payment could not be captured
    PaymentFailed,
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransferFailed => write!(f, "TRANSFER_FAILED"),
            Self::PaymentFailed => write!(f, "PAYMENT_FAILED"),
        }
    }
}

impl std::str::FromStr for IssueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TRANSFER_FAILED" => Ok(Self::TransferFailed),
            "PAYMENT_FAILED" => Ok(Self::PaymentFailed),
            _ => Err(format!("Invalid issue type: {s}")),
        }
    }
}

/// Status of the funds transfer as reported by the transfer service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    #[default]
    NotAccepted,
    Accepted,
}

impl TransferStatus {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAccepted => write!(f, "NOT_ACCEPTED"),
            Self::Accepted => write!(f, "ACCEPTED"),
        }
    }
}

/// Diagnostic snapshot for one order.
///
/// The zero value (`CaseFile::default()`) is what queries return before the
/// case-file builder has completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CaseFile {
    pub order_id: String,
    pub issue_type: IssueType,
    pub buyer_email: String,
    pub transfer_status: TransferStatus,
    pub attempt_count: u32,
    pub generated_at: Option<DateTime<Utc>>,
}

impl CaseFile {
    /// Whether the case file has been populated by the builder
    pub fn is_built(&self) -> bool {
        !self.order_id.is_empty()
    }

    /// Record the result of a business retry attempt.
    ///
    /// `attempt_count` never decreases and `transfer_status` never moves back
    /// from `ACCEPTED`.
    pub fn record_attempt(&mut self, attempt: u32, status: TransferStatus) {
        self.attempt_count = self.attempt_count.max(attempt);
        if status.is_accepted() {
            self.transfer_status = TransferStatus::Accepted;
        }
    }
}
