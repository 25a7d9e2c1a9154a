use super::{
    actions::{LogTransitionAction, PublishTransitionEventAction, StateAction},
    errors::{StateMachineError, StateMachineResult},
    events::ResolutionEvent,
    guards::resolution_guards,
    process_state::ProcessState,
    states::ResolutionState,
};
use crate::events::publisher::EventPublisher;
use crate::models::IssueType;
use parking_lot::RwLock;

/// Transition engine for order-resolution processes.
///
/// The transition table and guards are pure functions of the process state
/// and the event; the engine adds the side-effecting actions that run after
/// a live transition.
pub struct ResolutionStateMachine {
    actions: Vec<Box<dyn StateAction<ProcessState> + Send + Sync>>,
}

impl ResolutionStateMachine {
    /// Create a state machine publishing lifecycle events on `event_publisher`
    pub fn new(event_publisher: EventPublisher) -> Self {
        Self {
            actions: vec![
                Box::new(PublishTransitionEventAction::new(event_publisher)),
                Box::new(LogTransitionAction),
            ],
        }
    }

    /// Apply `event` to the shared process state.
    ///
    /// The write lock is held only while the state is mutated, so concurrent
    /// queries never wait on actions. Actions are skipped when `live` is false.
    pub async fn transition(
        &self,
        process: &RwLock<ProcessState>,
        event: &ResolutionEvent,
        live: bool,
    ) -> StateMachineResult<ResolutionState> {
        let (from_state, to_state, snapshot) = {
            let mut state = process.write();
            let (from, to) = state.apply(event)?;
            (from, to, live.then(|| (*state).clone()))
        };

        if let Some(snapshot) = snapshot {
            self.execute_actions(&snapshot, from_state, to_state, event)
                .await;
        }

        Ok(to_state)
    }

    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        process: &ProcessState,
        event: &ResolutionEvent,
    ) -> StateMachineResult<ResolutionState> {
        let target = match (process.state, event) {
            // Case file branch
            (ResolutionState::Building, ResolutionEvent::CaseFileBuilt { case_file, .. }) => {
                match case_file.issue_type {
                    IssueType::TransferFailed => ResolutionState::Retrying,
                    _ => ResolutionState::Building,
                }
            }

            // Business retries
            (ResolutionState::Retrying, ResolutionEvent::RetryAttempted { .. }) => {
                ResolutionState::Retrying
            }

            // Escalation
            (
                ResolutionState::Building | ResolutionState::Retrying,
                ResolutionEvent::TaskCreated { .. },
            ) => ResolutionState::AwaitingDecision,

            // Verdicts stay at the gate until the outcome is recorded
            (
                ResolutionState::AwaitingDecision,
                ResolutionEvent::DecisionReceived { .. } | ResolutionEvent::DecisionTimedOut { .. },
            ) if !process.decision_timed_out => ResolutionState::AwaitingDecision,

            // Termination
            (from_state, ResolutionEvent::Resolved { .. }) if !from_state.is_terminal() => {
                ResolutionState::Resolved
            }

            // Invalid transitions
            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: Some(from_state.to_string()),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }

    /// Check guard conditions for the event
    pub fn check_guards(process: &ProcessState, event: &ResolutionEvent) -> StateMachineResult<()> {
        for guard in resolution_guards() {
            guard.check(process, event).map_err(|err| {
                tracing::debug!(
                    process_id = %process.process_id,
                    guard = guard.description(),
                    error = %err,
                    "Transition guard rejected event"
                );
                err
            })?;
        }
        Ok(())
    }

    /// Execute actions after a successful live transition.
    ///
    /// The transition is already recorded when actions run, so failures are
    /// logged rather than propagated.
    async fn execute_actions(
        &self,
        process: &ProcessState,
        from_state: ResolutionState,
        to_state: ResolutionState,
        event: &ResolutionEvent,
    ) {
        for action in &self.actions {
            if let Err(err) = action.execute(process, from_state, to_state, event).await {
                tracing::warn!(
                    process_id = %process.process_id,
                    action = action.description(),
                    error = %err,
                    "Transition action failed"
                );
            }
        }
    }
}

impl Default for ResolutionStateMachine {
    fn default() -> Self {
        Self::new(EventPublisher::default())
    }
}
