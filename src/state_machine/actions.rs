use super::errors::{ActionError, ActionResult};
use super::events::ResolutionEvent;
use super::process_state::ProcessState;
use super::states::ResolutionState;
use crate::events::publisher::EventPublisher;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Trait for implementing state transition actions.
///
/// Actions run only for live transitions, never while history is replayed.
#[async_trait]
pub trait StateAction<T> {
    /// Execute the action
    async fn execute(
        &self,
        entity: &T,
        from_state: ResolutionState,
        to_state: ResolutionState,
        event: &ResolutionEvent,
    ) -> ActionResult<()>;

    /// Get a description of this action for logging
    fn description(&self) -> &'static str;
}

/// Action to publish lifecycle events when state transitions occur
pub struct PublishTransitionEventAction {
    event_publisher: EventPublisher,
}

impl PublishTransitionEventAction {
    pub fn new(event_publisher: EventPublisher) -> Self {
        Self { event_publisher }
    }
}

#[async_trait]
impl StateAction<ProcessState> for PublishTransitionEventAction {
    async fn execute(
        &self,
        process: &ProcessState,
        from_state: ResolutionState,
        to_state: ResolutionState,
        event: &ResolutionEvent,
    ) -> ActionResult<()> {
        let event_name = event.lifecycle_event_name();
        let context = build_transition_context(process, from_state, to_state, event)?;

        self.event_publisher
            .publish(event_name, context)
            .await
            .map_err(|_| ActionError::EventPublishFailed {
                event_name: event_name.to_string(),
            })
    }

    fn description(&self) -> &'static str {
        "Publish lifecycle event for resolution transition"
    }
}

/// Action to log transitions into and out of the decision gate
pub struct LogTransitionAction;

#[async_trait]
impl StateAction<ProcessState> for LogTransitionAction {
    async fn execute(
        &self,
        process: &ProcessState,
        from_state: ResolutionState,
        to_state: ResolutionState,
        event: &ResolutionEvent,
    ) -> ActionResult<()> {
        match event {
            ResolutionEvent::TaskCreated { task } => {
                tracing::info!(
                    process_id = %process.process_id,
                    task_id = %task.id,
                    task_type = %task.task_type,
                    "Process escalated to human decision"
                );
            }
            ResolutionEvent::Resolved { outcome, .. } => {
                tracing::info!(
                    process_id = %process.process_id,
                    order_id = %process.order_id,
                    outcome = %outcome,
                    attempts = process.case_file.attempt_count,
                    "Process resolved"
                );
            }
            _ => {
                tracing::debug!(
                    process_id = %process.process_id,
                    from = %from_state,
                    to = %to_state,
                    event = event.event_type(),
                    "Resolution transition applied"
                );
            }
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Log resolution transition"
    }
}

fn build_transition_context(
    process: &ProcessState,
    from_state: ResolutionState,
    to_state: ResolutionState,
    event: &ResolutionEvent,
) -> ActionResult<Value> {
    Ok(json!({
        "process_id": process.process_id,
        "order_id": process.order_id,
        "from_state": from_state.to_string(),
        "to_state": to_state.to_string(),
        "event": serde_json::to_value(event)?,
        "transitioned_at": event.at(),
    }))
}
