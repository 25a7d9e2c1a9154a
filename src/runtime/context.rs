use super::clock::TimeSource;
use super::history::HistoryEvent;
use super::inbox::SignalInbox;
use super::store::HistoryStore;
use crate::activities::ActionError;
use crate::error::{ResolutionError, Result};
use crate::logging::log_action_operation;
use crate::models::TaskDecision;
use crate::orchestration::retry_policy::ActionRetryPolicy;
use crate::state_machine::{ProcessState, ResolutionEvent, ResolutionOutcome, ResolutionStateMachine};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Shared services every process context is built from
#[derive(Clone)]
pub struct RuntimeServices {
    pub store: Arc<dyn HistoryStore>,
    pub time: Arc<dyn TimeSource>,
    pub machine: Arc<ResolutionStateMachine>,
    pub action_policy: ActionRetryPolicy,
}

/// What woke the decision gate
#[derive(Debug, Clone, PartialEq)]
pub enum GateSignal {
    Decision(TaskDecision),
    DeadlineReached,
}

/// Execution context of one process.
///
/// Starts in replay mode: action results, signals and timer firings are
/// served from the recorded history and state events are checked against
/// it. Once the history is exhausted the context goes live and every new
/// fact is appended to the store before it is acted on.
pub struct ProcessContext {
    process_id: String,
    order_id: String,
    services: RuntimeServices,
    inbox: SignalInbox,
    state: Arc<RwLock<ProcessState>>,
    history: Vec<HistoryEvent>,
    cursor: usize,
    clock: DateTime<Utc>,
}

impl ProcessContext {
    /// Load a context from the stored history of `process_id`, starting
    /// from a fresh process state
    pub fn load(
        services: RuntimeServices,
        process_id: &str,
        inbox: SignalInbox,
    ) -> Result<Self> {
        let history = services.store.read_history(process_id)?;

        let (order_id, clock) = match history.first() {
            Some(HistoryEvent::ProcessStarted { order_id, at, .. }) => (order_id.clone(), *at),
            Some(other) => {
                return Err(ResolutionError::Internal(format!(
                    "history of {process_id} starts with {}",
                    other.describe()
                )))
            }
            None => {
                return Err(ResolutionError::ProcessNotFound {
                    process_id: process_id.to_string(),
                })
            }
        };

        let state = Arc::new(RwLock::new(ProcessState::new(process_id, order_id.as_str())));

        Ok(Self {
            process_id: process_id.to_string(),
            order_id,
            services,
            inbox,
            state,
            history,
            cursor: 1,
            clock,
        })
    }

    pub fn process_id(&self) -> &str {
        &self.process_id
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    /// Logical time: the timestamp of the last consumed history event
    pub fn now(&self) -> DateTime<Utc> {
        self.clock
    }

    /// Whether recorded history remains to be replayed
    pub fn is_replaying(&self) -> bool {
        self.cursor < self.history.len()
    }

    /// Shared process state read by queries
    pub fn state(&self) -> &Arc<RwLock<ProcessState>> {
        &self.state
    }

    /// Point-in-time copy of the process state
    pub fn snapshot(&self) -> ProcessState {
        self.state.read().clone()
    }

    /// Invoke an external action under the retry policy, or serve its
    /// recorded result during replay.
    ///
    /// Only the final outcome is recorded. A permanent failure, or running
    /// out of attempts on transient failures, yields
    /// `ResolutionError::PermanentAction`.
    pub async fn execute_action<T, F, Fut>(&mut self, action: &str, key: &str, mut call: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = std::result::Result<T, ActionError>> + Send,
    {
        if let Some(recorded) = self.peek() {
            return match recorded {
                HistoryEvent::ActionCompleted {
                    action: a,
                    key: k,
                    result,
                    ..
                } if a == action && k == key => {
                    self.consume();
                    Ok(serde_json::from_value(result)?)
                }
                HistoryEvent::ActionFailed {
                    action: a,
                    key: k,
                    reason,
                    ..
                } if a == action && k == key => {
                    self.consume();
                    Err(ResolutionError::PermanentAction {
                        action: action.to_string(),
                        reason,
                    })
                }
                other => Err(self.nondeterminism(&other, format!("action({action}, {key})"))),
            };
        }

        let policy = self.services.action_policy.clone();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(policy.start_to_close_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(ActionError::Transient(format!(
                    "start-to-close timeout of {:?} exceeded",
                    policy.start_to_close_timeout
                ))),
            };

            let failure = match outcome {
                Ok(value) => {
                    let result = serde_json::to_value(&value)?;
                    self.append_live(|at| HistoryEvent::ActionCompleted {
                        action: action.to_string(),
                        key: key.to_string(),
                        result,
                        attempts: attempt,
                        at,
                    })?;
                    log_action_operation(action, &self.process_id, attempt, "completed", Some(key));
                    return Ok(value);
                }
                Err(err) => ResolutionError::from_action_failure(action, err),
            };

            if failure.is_retryable() && policy.allows_retry_after(attempt) {
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    process_id = %self.process_id,
                    action = action,
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %failure,
                    "Transient action failure, retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            let reason = match failure {
                ResolutionError::TransientAction { reason, .. } => {
                    format!("retry policy exhausted after {attempt} attempts: {reason}")
                }
                ResolutionError::PermanentAction { reason, .. } => reason,
                other => other.to_string(),
            };
            self.append_live(|at| HistoryEvent::ActionFailed {
                action: action.to_string(),
                key: key.to_string(),
                reason: reason.clone(),
                attempts: attempt,
                at,
            })?;
            log_action_operation(action, &self.process_id, attempt, "failed", Some(reason.as_str()));
            return Err(ResolutionError::PermanentAction {
                action: action.to_string(),
                reason,
            });
        }
    }

    /// Apply a state machine event, recording it when live.
    ///
    /// During replay the event must equal the recorded one. Live events are
    /// validated before they are appended, so an invalid event never
    /// reaches the history.
    pub async fn record(&mut self, event: ResolutionEvent) -> Result<()> {
        if let Some(recorded) = self.peek() {
            return match recorded {
                HistoryEvent::StateRecorded {
                    event: recorded_event,
                    ..
                } if recorded_event == event => {
                    self.consume();
                    self.services
                        .machine
                        .transition(&self.state, &recorded_event, false)
                        .await?;
                    Ok(())
                }
                other => Err(self.nondeterminism(
                    &other,
                    format!("state_recorded({})", event.event_type()),
                )),
            };
        }

        {
            let state = self.state.read();
            ResolutionStateMachine::determine_target_state(&state, &event)?;
            ResolutionStateMachine::check_guards(&state, &event)?;
        }

        let recorded = event.clone();
        self.append_live(|at| HistoryEvent::StateRecorded {
            event: recorded,
            at,
        })?;
        self.services
            .machine
            .transition(&self.state, &event, true)
            .await?;
        Ok(())
    }

    /// Suspend until a decision signal arrives or `deadline` passes.
    ///
    /// Signals are consumed in delivery order. The wait is an async
    /// suspension on the inbox; no polling takes place.
    pub async fn next_signal(
        &mut self,
        task_id: &str,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<GateSignal> {
        if let Some(recorded) = self.peek() {
            return match recorded {
                HistoryEvent::SignalReceived { decision, .. } => {
                    self.consume();
                    Ok(GateSignal::Decision(decision))
                }
                HistoryEvent::GateTimerFired { task_id: t, .. } if t == task_id => {
                    self.consume();
                    Ok(GateSignal::DeadlineReached)
                }
                other => Err(self.nondeterminism(&other, "signal_or_gate_timer".to_string())),
            };
        }

        loop {
            if let Some(decision) = self.take_signal()? {
                return Ok(GateSignal::Decision(decision));
            }

            let Some(deadline) = deadline else {
                self.inbox.wait().await;
                continue;
            };

            let remaining = (deadline - self.services.time.now())
                .to_std()
                .unwrap_or(Duration::ZERO);
            let timed_out = tokio::select! {
                _ = self.inbox.wait() => false,
                _ = tokio::time::sleep(remaining) => true,
            };

            if timed_out {
                // A signal delivered right at the deadline still wins
                if let Some(decision) = self.take_signal()? {
                    return Ok(GateSignal::Decision(decision));
                }
                self.append_live(|at| HistoryEvent::GateTimerFired {
                    task_id: task_id.to_string(),
                    at: at.max(deadline),
                })?;
                return Ok(GateSignal::DeadlineReached);
            }
        }
    }

    /// Record successful completion, or confirm it during replay
    pub fn complete(&mut self, outcome: ResolutionOutcome) -> Result<()> {
        if let Some(recorded) = self.peek() {
            return match recorded {
                HistoryEvent::ProcessCompleted { outcome: o, .. } if o == outcome => {
                    self.consume();
                    Ok(())
                }
                other => Err(self.nondeterminism(&other, format!("process_completed({outcome})"))),
            };
        }
        self.append_live(|at| HistoryEvent::ProcessCompleted { outcome, at })?;
        Ok(())
    }

    /// Record process failure unless the history already ends with it
    pub fn fail(&mut self, reason: &str) -> Result<()> {
        if let Some(HistoryEvent::ProcessFailed { .. }) = self.peek() {
            self.consume();
            return Ok(());
        }
        self.append_live(|at| HistoryEvent::ProcessFailed {
            reason: reason.to_string(),
            at,
        })?;
        Ok(())
    }

    fn peek(&self) -> Option<HistoryEvent> {
        self.history.get(self.cursor).cloned()
    }

    fn consume(&mut self) {
        if let Some(event) = self.history.get(self.cursor) {
            self.clock = event.at();
            self.cursor += 1;
        }
    }

    /// Stamp a new event with a time no earlier than the logical clock
    fn next_timestamp(&self) -> DateTime<Utc> {
        self.services.time.now().max(self.clock)
    }

    fn append_live(&mut self, build: impl FnOnce(DateTime<Utc>) -> HistoryEvent) -> Result<()> {
        let event = build(self.next_timestamp());
        self.services.store.append(&self.process_id, event.clone())?;
        self.push_consumed(event);
        Ok(())
    }

    fn take_signal(&mut self) -> Result<Option<TaskDecision>> {
        let at = self.next_timestamp();
        let Some(decision) = self.inbox.take(at)? else {
            return Ok(None);
        };
        self.push_consumed(HistoryEvent::SignalReceived {
            decision: decision.clone(),
            at,
        });
        Ok(Some(decision))
    }

    fn push_consumed(&mut self, event: HistoryEvent) {
        self.clock = event.at();
        self.history.push(event);
        self.cursor = self.history.len();
    }

    fn nondeterminism(&self, recorded: &HistoryEvent, actual: String) -> ResolutionError {
        tracing::error!(
            process_id = %self.process_id,
            position = self.cursor,
            recorded = %recorded.describe(),
            replayed = %actual,
            "Replay diverged from recorded history"
        );
        ResolutionError::Nondeterminism {
            position: self.cursor,
            expected: recorded.describe(),
            actual,
        }
    }
}
