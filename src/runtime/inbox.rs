use super::store::HistoryStore;
use crate::error::Result;
use crate::models::TaskDecision;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Notify;

/// Durable per-process signal inbox with an async wakeup.
///
/// Signals are persisted in the store before the waiter is notified, and
/// `Notify::notify_one` keeps a permit when nobody is waiting, so a signal
/// that arrives before the gate starts listening is never lost.
#[derive(Clone)]
pub struct SignalInbox {
    process_id: String,
    store: Arc<dyn HistoryStore>,
    notify: Arc<Notify>,
}

impl SignalInbox {
    pub fn new(process_id: impl Into<String>, store: Arc<dyn HistoryStore>) -> Self {
        Self {
            process_id: process_id.into(),
            store,
            notify: Arc::new(Notify::new()),
        }
    }

    /// Persist a signal and wake the waiting gate
    pub fn deliver(&self, decision: TaskDecision) -> Result<()> {
        self.store.enqueue_signal(&self.process_id, decision)?;
        self.notify.notify_one();
        Ok(())
    }

    /// Take the oldest queued signal, recording it in history
    pub fn take(&self, at: DateTime<Utc>) -> Result<Option<TaskDecision>> {
        self.store.dequeue_signal(&self.process_id, at)
    }

    /// Suspend until a signal may be available
    pub async fn wait(&self) {
        self.notify.notified().await;
    }

    pub fn process_id(&self) -> &str {
        &self.process_id
    }
}

impl std::fmt::Debug for SignalInbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalInbox")
            .field("process_id", &self.process_id)
            .finish()
    }
}
