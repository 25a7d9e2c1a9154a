use super::inbox::SignalInbox;
use crate::error::{ResolutionError, Result};
use crate::models::{AuditLog, CaseFile, HumanTask, TaskDecision};
use crate::state_machine::{ProcessState, ResolutionOutcome};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Execution status of a process, as opposed to its business state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessStatus {
    Running,
    Completed(ResolutionOutcome),
    Failed(String),
}

impl ProcessStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Running)
    }

    pub fn outcome(&self) -> Option<ResolutionOutcome> {
        match self {
            Self::Completed(outcome) => Some(*outcome),
            _ => None,
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed(outcome) => write!(f, "completed({outcome})"),
            Self::Failed(reason) => write!(f, "failed({reason})"),
        }
    }
}

/// Handle to one running process.
///
/// Queries read the shared state under a short read lock and never wait on
/// the process's own execution, even while it is suspended at the gate.
pub struct ProcessHandle {
    process_id: String,
    order_id: String,
    state: Arc<RwLock<ProcessState>>,
    status: watch::Receiver<ProcessStatus>,
    inbox: SignalInbox,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ProcessHandle {
    pub(crate) fn new(
        process_id: String,
        order_id: String,
        state: Arc<RwLock<ProcessState>>,
        status: watch::Receiver<ProcessStatus>,
        inbox: SignalInbox,
    ) -> Self {
        Self {
            process_id,
            order_id,
            state,
            status,
            inbox,
            task: Mutex::new(None),
        }
    }

    pub(crate) fn attach(&self, task: JoinHandle<()>) {
        *self.task.lock() = Some(task);
    }

    pub fn process_id(&self) -> &str {
        &self.process_id
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    /// Current case file; the zero value until the builder has completed
    pub fn casefile(&self) -> CaseFile {
        self.state.read().case_file.clone()
    }

    /// Current pending human task, if any
    pub fn pending_task(&self) -> Option<HumanTask> {
        self.state.read().pending_task.clone()
    }

    /// Full ordered audit log as of now
    pub fn audit_log(&self) -> AuditLog {
        self.state.read().audit_log.clone()
    }

    /// Point-in-time copy of the whole process state
    pub fn snapshot(&self) -> ProcessState {
        self.state.read().clone()
    }

    pub fn status(&self) -> ProcessStatus {
        self.status.borrow().clone()
    }

    /// Deliver a decision signal. Mismatched decisions are accepted here and
    /// discarded by the gate.
    pub fn signal_task_decision(&self, decision: TaskDecision) -> Result<()> {
        if self.status().is_finished() {
            return Err(ResolutionError::ProcessTerminated {
                process_id: self.process_id.clone(),
            });
        }
        self.inbox.deliver(decision)
    }

    /// Wait until the process completes or fails
    pub async fn wait_for_outcome(&self) -> Result<ProcessStatus> {
        let mut status = self.status.clone();
        let finished = status
            .wait_for(ProcessStatus::is_finished)
            .await
            .map_err(|_| {
                ResolutionError::Internal(format!(
                    "process {} stopped without reporting a status",
                    self.process_id
                ))
            })?;
        Ok((*finished).clone())
    }

    /// Whether the process task stopped (aborted or panicked) without
    /// reporting a final status
    pub fn is_stale(&self) -> bool {
        // Task before status: a task that finished normally has already sent it
        let stopped = self
            .task
            .lock()
            .as_ref()
            .map_or(true, JoinHandle::is_finished);
        stopped && !self.status().is_finished()
    }

    /// Stop the process task without recording anything, as a crash would
    pub fn abort(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("process_id", &self.process_id)
            .field("status", &self.status())
            .finish()
    }
}
