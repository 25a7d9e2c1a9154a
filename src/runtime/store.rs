use super::history::HistoryEvent;
use crate::error::{ResolutionError, Result};
use crate::models::TaskDecision;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;

/// Durable storage for process histories and signal inboxes.
///
/// Histories are append-only. Each process owns a FIFO inbox of decision
/// signals that survives restarts of the engine.
pub trait HistoryStore: Send + Sync {
    /// Create a process whose history starts with `ProcessStarted`.
    /// Fails with `AlreadyStarted` if the identity exists.
    fn create_process(&self, process_id: &str, order_id: &str, at: DateTime<Utc>) -> Result<()>;

    /// Append an event; returns its position in the history
    fn append(&self, process_id: &str, event: HistoryEvent) -> Result<usize>;

    fn read_history(&self, process_id: &str) -> Result<Vec<HistoryEvent>>;

    /// Queue a decision signal for later delivery
    fn enqueue_signal(&self, process_id: &str, decision: TaskDecision) -> Result<()>;

    /// Atomically move the oldest queued signal into the history as
    /// `SignalReceived` stamped `at`
    fn dequeue_signal(&self, process_id: &str, at: DateTime<Utc>) -> Result<Option<TaskDecision>>;

    /// Signals delivered but not yet consumed, oldest first
    fn pending_signals(&self, process_id: &str) -> Result<Vec<TaskDecision>>;

    fn process_ids(&self) -> Vec<String>;
}

#[derive(Debug, Default)]
struct ProcessRecord {
    history: Vec<HistoryEvent>,
    inbox: VecDeque<TaskDecision>,
}

impl ProcessRecord {
    fn is_terminated(&self) -> bool {
        self.history.last().is_some_and(HistoryEvent::is_terminal)
    }
}

/// In-memory history store for tests and single-process demos
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    processes: DashMap<String, ProcessRecord>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn not_found(process_id: &str) -> ResolutionError {
        ResolutionError::ProcessNotFound {
            process_id: process_id.to_string(),
        }
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn create_process(&self, process_id: &str, order_id: &str, at: DateTime<Utc>) -> Result<()> {
        match self.processes.entry(process_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(ResolutionError::AlreadyStarted {
                process_id: process_id.to_string(),
            }),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(ProcessRecord {
                    history: vec![HistoryEvent::ProcessStarted {
                        process_id: process_id.to_string(),
                        order_id: order_id.to_string(),
                        at,
                    }],
                    inbox: VecDeque::new(),
                });
                Ok(())
            }
        }
    }

    fn append(&self, process_id: &str, event: HistoryEvent) -> Result<usize> {
        let mut record = self
            .processes
            .get_mut(process_id)
            .ok_or_else(|| Self::not_found(process_id))?;

        if record.is_terminated() {
            return Err(ResolutionError::ProcessTerminated {
                process_id: process_id.to_string(),
            });
        }

        record.history.push(event);
        Ok(record.history.len() - 1)
    }

    fn read_history(&self, process_id: &str) -> Result<Vec<HistoryEvent>> {
        self.processes
            .get(process_id)
            .map(|record| record.history.clone())
            .ok_or_else(|| Self::not_found(process_id))
    }

    fn enqueue_signal(&self, process_id: &str, decision: TaskDecision) -> Result<()> {
        let mut record = self
            .processes
            .get_mut(process_id)
            .ok_or_else(|| Self::not_found(process_id))?;

        if record.is_terminated() {
            return Err(ResolutionError::ProcessTerminated {
                process_id: process_id.to_string(),
            });
        }

        record.inbox.push_back(decision);
        Ok(())
    }

    fn dequeue_signal(&self, process_id: &str, at: DateTime<Utc>) -> Result<Option<TaskDecision>> {
        let mut record = self
            .processes
            .get_mut(process_id)
            .ok_or_else(|| Self::not_found(process_id))?;

        let Some(decision) = record.inbox.pop_front() else {
            return Ok(None);
        };

        record.history.push(HistoryEvent::SignalReceived {
            decision: decision.clone(),
            at,
        });
        Ok(Some(decision))
    }

    fn pending_signals(&self, process_id: &str) -> Result<Vec<TaskDecision>> {
        self.processes
            .get(process_id)
            .map(|record| record.inbox.iter().cloned().collect())
            .ok_or_else(|| Self::not_found(process_id))
    }

    fn process_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.processes.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}
