use crate::config::ConfigurationError;
use crate::constants::task_id_for;
use crate::error::Result;
use crate::models::{HumanTask, TaskDecision};
use crate::runtime::{GateSignal, ProcessContext};
use crate::state_machine::{ResolutionEvent, ResolutionOutcome};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// How the gate was released
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    Decided(TaskDecision),
    TimedOut,
}

impl GateVerdict {
    /// Terminal outcome implied by the verdict
    pub fn outcome(&self) -> ResolutionOutcome {
        match self {
            Self::Decided(decision) if decision.approved => ResolutionOutcome::EscalatedApproved,
            Self::Decided(_) | Self::TimedOut => ResolutionOutcome::PendingManualReview,
        }
    }
}

/// Suspends a process until a human decides on its pending task.
///
/// Decisions for any other task id are discarded without a state change or
/// an audit entry. With no timeout the gate waits indefinitely.
#[derive(Debug, Clone, Default)]
pub struct HumanDecisionGate {
    timeout: Option<Duration>,
}

impl HumanDecisionGate {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Open a human task for the process and wait for its verdict
    pub async fn escalate(
        &self,
        ctx: &mut ProcessContext,
        task_type: &str,
        title: impl Into<String>,
        reason: impl Into<String>,
    ) -> Result<ResolutionOutcome> {
        let task = HumanTask {
            id: task_id_for(ctx.order_id()),
            order_id: ctx.order_id().to_string(),
            task_type: task_type.to_string(),
            title: title.into(),
            reason: reason.into(),
            created_at: ctx.now(),
        };

        ctx.record(ResolutionEvent::TaskCreated { task: task.clone() })
            .await?;

        let verdict = self.await_decision(ctx, &task).await?;
        Ok(verdict.outcome())
    }

    /// Wait for a decision matching `task`, or for the deadline
    pub async fn await_decision(
        &self,
        ctx: &mut ProcessContext,
        task: &HumanTask,
    ) -> Result<GateVerdict> {
        let deadline = match self.timeout {
            Some(timeout) => Some(deadline_for(task, timeout)?),
            None => None,
        };

        loop {
            match ctx.next_signal(&task.id, deadline).await? {
                GateSignal::Decision(decision) if decision.matches(task) => {
                    let at = ctx.now();
                    ctx.record(ResolutionEvent::DecisionReceived {
                        decision: decision.clone(),
                        at,
                    })
                    .await?;
                    return Ok(GateVerdict::Decided(decision));
                }
                GateSignal::Decision(decision) => {
                    tracing::info!(
                        process_id = %ctx.process_id(),
                        expected_task = %task.id,
                        received_task = %decision.task_id,
                        "Discarding decision for a different task"
                    );
                }
                GateSignal::DeadlineReached => {
                    let at = ctx.now();
                    ctx.record(ResolutionEvent::DecisionTimedOut {
                        task_id: task.id.clone(),
                        at,
                    })
                    .await?;
                    return Ok(GateVerdict::TimedOut);
                }
            }
        }
    }
}

/// Task creation time plus `timeout`, rejecting deadlines chrono cannot represent
fn deadline_for(task: &HumanTask, timeout: Duration) -> Result<DateTime<Utc>> {
    chrono::Duration::from_std(timeout)
        .ok()
        .and_then(|timeout| task.created_at.checked_add_signed(timeout))
        .ok_or_else(|| {
            ConfigurationError::invalid_value(
                "decision_gate.timeout_seconds",
                timeout.as_secs().to_string(),
                format!("deadline for task {} is out of range", task.id),
            )
            .into()
        })
}
