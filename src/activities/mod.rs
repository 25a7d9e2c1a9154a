//! # External Collaborators
//!
//! Contracts for the two side-effecting actions a resolution process invokes.
//! Implementations are injected into the engine; nothing is looked up from
//! a global registry.

pub mod mock;

pub use mock::{MockCaseFileBuilder, MockTransferRetrier};

use crate::models::{CaseFile, TransferStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure reported by a collaborator.
///
/// Business-negative results such as `NOT_ACCEPTED` are ordinary return
/// values, never errors.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionError {
    /// Retryable under the invocation policy
    #[error("transient: {0}")]
    Transient(String),
    /// Fails the whole process
    #[error("permanent: {0}")]
    Permanent(String),
}

/// Idempotency key of one business retry attempt: `(orderID, attempt)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey {
    pub order_id: String,
    pub attempt: u32,
}

impl IdempotencyKey {
    pub fn new(order_id: impl Into<String>, attempt: u32) -> Self {
        Self {
            order_id: order_id.into(),
            attempt,
        }
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:retry-transfer:{}", self.order_id, self.attempt)
    }
}

/// Aggregates order context into a case file
#[async_trait]
pub trait CaseFileBuilder: Send + Sync {
    async fn build_case_file(&self, order_id: &str) -> Result<CaseFile, ActionError>;
}

/// Retries the funds transfer for an order.
///
/// Must be idempotent: repeated calls with the same key return the same
/// status and perform the transfer at most once.
#[async_trait]
pub trait TransferRetrier: Send + Sync {
    async fn retry_transfer(&self, key: &IdempotencyKey) -> Result<TransferStatus, ActionError>;
}
