use super::errors::StateMachineResult;
use super::events::ResolutionEvent;
use super::resolution_state_machine::ResolutionStateMachine;
use super::states::{ResolutionOutcome, ResolutionState};
use crate::models::{AuditEvent, AuditKind, AuditLog, CaseFile, HumanTask, TaskDecision};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Aggregate state of one order-resolution process.
///
/// Mutated only through [`ProcessState::apply`], which appends exactly one
/// audit entry per applied event. Reconstructable by [`ProcessState::replay`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessState {
    pub process_id: String,
    pub order_id: String,
    pub state: ResolutionState,
    pub case_file: CaseFile,
    pub pending_task: Option<HumanTask>,
    pub last_decision: Option<TaskDecision>,
    pub decision_timed_out: bool,
    pub outcome: Option<ResolutionOutcome>,
    pub audit_log: AuditLog,
}

impl ProcessState {
    /// Fresh state for a just-started process; the case file is empty
    pub fn new(process_id: impl Into<String>, order_id: impl Into<String>) -> Self {
        Self {
            process_id: process_id.into(),
            order_id: order_id.into(),
            state: ResolutionState::default(),
            case_file: CaseFile::default(),
            pending_task: None,
            last_decision: None,
            decision_timed_out: false,
            outcome: None,
            audit_log: AuditLog::new(),
        }
    }

    /// Rebuild a process state by applying recorded events in order
    pub fn replay<'a>(
        process_id: impl Into<String>,
        order_id: impl Into<String>,
        events: impl IntoIterator<Item = &'a ResolutionEvent>,
    ) -> StateMachineResult<Self> {
        let mut state = Self::new(process_id, order_id);
        for event in events {
            state.apply(event)?;
        }
        Ok(state)
    }

    /// Apply one event: validate the transition, run guards, mutate, audit.
    ///
    /// Returns the `(from, to)` states. On error nothing is mutated.
    pub fn apply(
        &mut self,
        event: &ResolutionEvent,
    ) -> StateMachineResult<(ResolutionState, ResolutionState)> {
        let from = self.state;
        let to = ResolutionStateMachine::determine_target_state(self, event)?;
        ResolutionStateMachine::check_guards(self, event)?;

        match event {
            ResolutionEvent::CaseFileBuilt { case_file, .. } => {
                self.case_file = case_file.clone();
            }
            ResolutionEvent::RetryAttempted {
                attempt, status, ..
            } => {
                self.case_file.record_attempt(*attempt, *status);
            }
            ResolutionEvent::TaskCreated { task } => {
                self.pending_task = Some(task.clone());
            }
            ResolutionEvent::DecisionReceived { decision, .. } => {
                self.last_decision = Some(decision.clone());
                self.pending_task = None;
            }
            ResolutionEvent::DecisionTimedOut { .. } => {
                self.decision_timed_out = true;
            }
            ResolutionEvent::Resolved { outcome, .. } => {
                self.outcome = Some(*outcome);
                self.pending_task = None;
            }
        }

        self.state = to;
        self.audit_log.append(audit_entry_for(event));
        Ok((from, to))
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn case_file(&self) -> &CaseFile {
        &self.case_file
    }

    pub fn pending_task(&self) -> Option<&HumanTask> {
        self.pending_task.as_ref()
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit_log
    }
}

/// The single audit record describing an applied event
fn audit_entry_for(event: &ResolutionEvent) -> AuditEvent {
    match event {
        ResolutionEvent::CaseFileBuilt { case_file, at } => AuditEvent::new(
            *at,
            AuditKind::CasefileBuilt,
            format!(
                "Case file built for order {} ({})",
                case_file.order_id, case_file.issue_type
            ),
            json!({
                "orderId": case_file.order_id,
                "issueType": case_file.issue_type,
                "transferStatus": case_file.transfer_status,
            }),
        ),
        ResolutionEvent::RetryAttempted {
            attempt,
            status,
            at,
        } => AuditEvent::new(
            *at,
            AuditKind::RetryTransfer,
            format!("Transfer retry attempt {attempt} returned {status}"),
            json!({ "attempt": attempt, "status": status }),
        ),
        ResolutionEvent::TaskCreated { task } => AuditEvent::new(
            task.created_at,
            AuditKind::TaskCreated,
            format!("Human task {} created: {}", task.id, task.title),
            json!({
                "taskId": task.id,
                "type": task.task_type,
                "reason": task.reason,
            }),
        ),
        ResolutionEvent::DecisionReceived { decision, at } => AuditEvent::new(
            *at,
            AuditKind::DecisionReceived,
            format!(
                "Decision for task {}: {}",
                decision.task_id,
                if decision.approved {
                    "approved"
                } else {
                    "rejected"
                }
            ),
            json!({
                "taskId": decision.task_id,
                "approved": decision.approved,
                "notes": decision.notes,
                "decider": decision.decider,
                "decidedAt": decision.decided_at,
            }),
        ),
        ResolutionEvent::DecisionTimedOut { task_id, at } => AuditEvent::new(
            *at,
            AuditKind::DecisionTimedOut,
            format!("No decision for task {task_id} before the gate deadline"),
            json!({ "taskId": task_id }),
        ),
        ResolutionEvent::Resolved { outcome, at } => {
            let data = match outcome {
                ResolutionOutcome::EscalatedRejected => json!({
                    "outcome": outcome,
                    "remediationAttempted": false,
                }),
                _ => json!({ "outcome": outcome }),
            };
            AuditEvent::new(
                *at,
                AuditKind::Resolved,
                format!("Process resolved with outcome {outcome}"),
                data,
            )
        }
    }
}
