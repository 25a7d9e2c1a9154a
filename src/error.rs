use crate::activities::ActionError;
use crate::config::ConfigurationError;
use crate::state_machine::StateMachineError;
use thiserror::Error;

/// Crate-wide error for order-resolution processes
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// Retryable collaborator failure; the invocation policy may try again
    #[error("Transient failure in action {action}: {reason}")]
    TransientAction { action: String, reason: String },

    /// Non-retryable collaborator failure, or the invocation policy was exhausted
    #[error("Permanent failure in action {action}: {reason}")]
    PermanentAction { action: String, reason: String },

    #[error("Process {process_id} already started")]
    AlreadyStarted { process_id: String },

    #[error("Process {process_id} not found")]
    ProcessNotFound { process_id: String },

    #[error("Process {process_id} has terminated and accepts no further input")]
    ProcessTerminated { process_id: String },

    /// Replayed code diverged from the recorded history
    #[error("Nondeterminism at history position {position}: recorded {expected}, replayed {actual}")]
    Nondeterminism {
        position: usize,
        expected: String,
        actual: String,
    },

    #[error("State machine error: {0}")]
    StateMachine(#[from] StateMachineError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResolutionError {
    /// Classify a collaborator failure for `action`
    pub fn from_action_failure(action: &str, err: ActionError) -> Self {
        match err {
            ActionError::Transient(reason) => Self::TransientAction {
                action: action.to_string(),
                reason,
            },
            ActionError::Permanent(reason) => Self::PermanentAction {
                action: action.to_string(),
                reason,
            },
        }
    }

    /// Whether the substrate may retry the failed operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientAction { .. })
    }
}

pub type Result<T> = std::result::Result<T, ResolutionError>;
