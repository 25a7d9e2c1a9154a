use super::errors::{business_rule_violation, GuardError, GuardResult};
use super::events::ResolutionEvent;
use super::process_state::ProcessState;
use super::states::{ResolutionOutcome, ResolutionState};

/// Trait for implementing state transition guards
pub trait StateGuard<T> {
    /// Check if the event may be applied to the entity
    fn check(&self, entity: &T, event: &ResolutionEvent) -> GuardResult<()>;

    /// Get a description of this guard for logging
    fn description(&self) -> &'static str;
}

/// Guard ensuring the case file is recorded once and for the owning order
pub struct CaseFileOwnershipGuard;

impl StateGuard<ProcessState> for CaseFileOwnershipGuard {
    fn check(&self, process: &ProcessState, event: &ResolutionEvent) -> GuardResult<()> {
        if let ResolutionEvent::CaseFileBuilt { case_file, .. } = event {
            if process.case_file.is_built() {
                return Err(business_rule_violation(format!(
                    "Case file for {} was already built",
                    process.order_id
                )));
            }
            if case_file.order_id != process.order_id {
                return Err(business_rule_violation(format!(
                    "Case file for {} cannot be attached to order {}",
                    case_file.order_id, process.order_id
                )));
            }
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Case file must be built once for the owning order"
    }
}

/// Guard ensuring retry attempts are numbered 1..N without gaps and stop
/// after the transfer was accepted
pub struct AttemptSequenceGuard;

impl StateGuard<ProcessState> for AttemptSequenceGuard {
    fn check(&self, process: &ProcessState, event: &ResolutionEvent) -> GuardResult<()> {
        if let ResolutionEvent::RetryAttempted { attempt, .. } = event {
            if process.case_file.transfer_status.is_accepted() {
                return Err(business_rule_violation(
                    "No retry may follow an accepted transfer",
                ));
            }
            let expected = process.case_file.attempt_count + 1;
            if *attempt != expected {
                return Err(business_rule_violation(format!(
                    "Retry attempt {attempt} out of sequence, expected {expected}"
                )));
            }
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Retry attempts must be sequential and stop after acceptance"
    }
}

/// Guard ensuring at most one human task per process, owned by its order
pub struct SingleTaskGuard;

impl StateGuard<ProcessState> for SingleTaskGuard {
    fn check(&self, process: &ProcessState, event: &ResolutionEvent) -> GuardResult<()> {
        if let ResolutionEvent::TaskCreated { task } = event {
            if process.pending_task.is_some() {
                return Err(business_rule_violation(format!(
                    "Process {} already has a pending task",
                    process.process_id
                )));
            }
            if task.order_id != process.order_id {
                return Err(business_rule_violation(format!(
                    "Task {} belongs to order {}, not {}",
                    task.id, task.order_id, process.order_id
                )));
            }
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Only one human task may be opened per process"
    }
}

/// Guard ensuring gate verdicts address the current pending task
pub struct DecisionMatchesTaskGuard;

impl StateGuard<ProcessState> for DecisionMatchesTaskGuard {
    fn check(&self, process: &ProcessState, event: &ResolutionEvent) -> GuardResult<()> {
        let task_id = match event {
            ResolutionEvent::DecisionReceived { decision, .. } => &decision.task_id,
            ResolutionEvent::DecisionTimedOut { task_id, .. } => task_id,
            _ => return Ok(()),
        };

        match &process.pending_task {
            Some(task) if &task.id == task_id => Ok(()),
            other => Err(GuardError::DecisionMismatch {
                expected: other.as_ref().map(|t| t.id.clone()),
                actual: task_id.clone(),
            }),
        }
    }

    fn description(&self) -> &'static str {
        "Verdicts must address the pending human task"
    }
}

/// Guard ensuring the terminal outcome agrees with how the process got there
pub struct OutcomeConsistencyGuard;

impl StateGuard<ProcessState> for OutcomeConsistencyGuard {
    fn check(&self, process: &ProcessState, event: &ResolutionEvent) -> GuardResult<()> {
        let ResolutionEvent::Resolved { outcome, .. } = event else {
            return Ok(());
        };

        let expected = match process.state {
            ResolutionState::Building => ResolutionOutcome::EscalatedRejected,
            ResolutionState::Retrying => {
                if !process.case_file.transfer_status.is_accepted() {
                    return Err(business_rule_violation(
                        "Cannot resolve automatically before the transfer is accepted",
                    ));
                }
                ResolutionOutcome::ResolvedAutomatically
            }
            ResolutionState::AwaitingDecision => match &process.last_decision {
                Some(decision) if decision.approved => ResolutionOutcome::EscalatedApproved,
                Some(_) => ResolutionOutcome::PendingManualReview,
                None if process.decision_timed_out => ResolutionOutcome::PendingManualReview,
                None => {
                    return Err(business_rule_violation(
                        "Cannot resolve an escalation before a verdict",
                    ))
                }
            },
            ResolutionState::Resolved => {
                return Err(GuardError::InvalidState {
                    state: process.state.to_string(),
                })
            }
        };

        if *outcome != expected {
            return Err(business_rule_violation(format!(
                "Outcome {outcome} inconsistent with state {}, expected {expected}",
                process.state
            )));
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Terminal outcome must match the path taken"
    }
}

/// All guards consulted before a resolution event is applied
pub fn resolution_guards() -> [&'static dyn StateGuard<ProcessState>; 5] {
    [
        &CaseFileOwnershipGuard,
        &AttemptSequenceGuard,
        &SingleTaskGuard,
        &DecisionMatchesTaskGuard,
        &OutcomeConsistencyGuard,
    ]
}
