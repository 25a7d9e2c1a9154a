//! # Resolution Engine
//!
//! Owns the injected collaborators, the history store, the time source and
//! every live process. Each process runs as its own tokio task driving
//! [`ResolveBrokenOrder`] through a [`ProcessContext`]; callers interact
//! with it through [`ProcessHandle`]s or the id-addressed operations here.
//!
//! A process whose task has stopped (for example after a crash) is brought
//! back with [`ResolutionEngine::recover`], which replays its recorded
//! history without invoking any already-completed action again.

use super::clock::{SystemTimeSource, TimeSource};
use super::context::{ProcessContext, RuntimeServices};
use super::handle::{ProcessHandle, ProcessStatus};
use super::inbox::SignalInbox;
use super::store::{HistoryStore, InMemoryHistoryStore};
use crate::activities::{CaseFileBuilder, TransferRetrier};
use crate::config::ResolutionConfig;
use crate::constants::{events, process_id_for};
use crate::error::{ResolutionError, Result};
use crate::events::EventPublisher;
use crate::logging::{log_error, log_process_operation};
use crate::models::{AuditLog, CaseFile, HumanTask, TaskDecision};
use crate::orchestration::{ResolveBrokenOrder, StrategyRegistry};
use crate::state_machine::ResolutionStateMachine;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;

pub struct ResolutionEngine {
    config: ResolutionConfig,
    case_files: Arc<dyn CaseFileBuilder>,
    retrier: Arc<dyn TransferRetrier>,
    services: RuntimeServices,
    publisher: EventPublisher,
    processes: DashMap<String, Arc<ProcessHandle>>,
}

impl ResolutionEngine {
    /// Create an engine with an in-memory store and the system clock
    pub fn new(
        config: ResolutionConfig,
        case_files: Arc<dyn CaseFileBuilder>,
        retrier: Arc<dyn TransferRetrier>,
    ) -> Self {
        let publisher = EventPublisher::new(config.events.publisher_capacity);
        let services = RuntimeServices {
            store: Arc::new(InMemoryHistoryStore::new()),
            time: Arc::new(SystemTimeSource),
            machine: Arc::new(ResolutionStateMachine::new(publisher.clone())),
            action_policy: config.activity.retry_policy(),
        };

        Self {
            config,
            case_files,
            retrier,
            services,
            publisher,
            processes: DashMap::new(),
        }
    }

    /// Use a different history store, e.g. one shared with a previous engine
    pub fn with_store(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.services.store = store;
        self
    }

    pub fn with_time_source(mut self, time: Arc<dyn TimeSource>) -> Self {
        self.services.time = time;
        self
    }

    /// Publish lifecycle events through `publisher`
    pub fn with_publisher(mut self, publisher: EventPublisher) -> Self {
        self.services.machine = Arc::new(ResolutionStateMachine::new(publisher.clone()));
        self.publisher = publisher;
        self
    }

    pub fn config(&self) -> &ResolutionConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn HistoryStore> {
        &self.services.store
    }

    pub fn event_publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    /// Start resolving `order_id`. One process exists per order; a second
    /// start is rejected with `AlreadyStarted`.
    pub async fn start(&self, order_id: &str) -> Result<Arc<ProcessHandle>> {
        if order_id.trim().is_empty() {
            return Err(ResolutionError::Internal(
                "order id must not be empty".to_string(),
            ));
        }

        let process_id = process_id_for(order_id);
        if self.processes.contains_key(&process_id) {
            return Err(ResolutionError::AlreadyStarted { process_id });
        }

        let started_at = self.services.time.now();
        self.services
            .store
            .create_process(&process_id, order_id, started_at)?;

        log_process_operation("start", &process_id, Some(order_id), "started", None);
        if let Err(err) = self
            .publisher
            .publish(
                events::PROCESS_STARTED,
                json!({
                    "process_id": process_id,
                    "order_id": order_id,
                    "started_at": started_at.to_rfc3339(),
                }),
            )
            .await
        {
            tracing::warn!(process_id = %process_id, error = %err, "Failed to publish process start");
        }

        self.ensure_running(&process_id)
    }

    /// Resume a process from its recorded history. Returns the existing
    /// handle when the process is already running in this engine; a handle
    /// whose task stopped without reporting a status is replaced.
    pub fn recover(&self, process_id: &str) -> Result<Arc<ProcessHandle>> {
        log_process_operation("recover", process_id, None, "requested", None);
        self.ensure_running(process_id)
    }

    /// Resume every process known to the store
    pub fn recover_all(&self) -> Result<Vec<Arc<ProcessHandle>>> {
        self.services
            .store
            .process_ids()
            .iter()
            .map(|process_id| self.recover(process_id))
            .collect()
    }

    pub fn handle(&self, process_id: &str) -> Result<Arc<ProcessHandle>> {
        self.live_handle(process_id)
            .ok_or_else(|| ResolutionError::ProcessNotFound {
                process_id: process_id.to_string(),
            })
    }

    pub fn casefile(&self, process_id: &str) -> Result<CaseFile> {
        Ok(self.handle(process_id)?.casefile())
    }

    pub fn pending_task(&self, process_id: &str) -> Result<Option<HumanTask>> {
        Ok(self.handle(process_id)?.pending_task())
    }

    pub fn audit_log(&self, process_id: &str) -> Result<AuditLog> {
        Ok(self.handle(process_id)?.audit_log())
    }

    pub fn status(&self, process_id: &str) -> Result<ProcessStatus> {
        Ok(self.handle(process_id)?.status())
    }

    /// Deliver a decision. A process known to the store but not running
    /// here keeps the signal queued until it is recovered.
    pub fn signal_task_decision(&self, process_id: &str, decision: TaskDecision) -> Result<()> {
        match self.live_handle(process_id) {
            Some(handle) => handle.signal_task_decision(decision),
            None => self.services.store.enqueue_signal(process_id, decision),
        }
    }

    pub async fn wait_for_outcome(&self, process_id: &str) -> Result<ProcessStatus> {
        self.handle(process_id)?.wait_for_outcome().await
    }

    /// Stop every process task without recording anything. History and
    /// queued signals stay in the store for a later `recover`.
    pub fn shutdown(&self) {
        for entry in self.processes.iter() {
            entry.value().abort();
        }
        self.processes.clear();
        tracing::info!("Resolution engine stopped all process tasks");
    }

    fn live_handle(&self, process_id: &str) -> Option<Arc<ProcessHandle>> {
        self.processes
            .get(process_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Check and insert under the map entry so one process never has two drivers
    fn ensure_running(&self, process_id: &str) -> Result<Arc<ProcessHandle>> {
        match self.processes.entry(process_id.to_string()) {
            Entry::Occupied(entry) if !entry.get().is_stale() => Ok(Arc::clone(entry.get())),
            Entry::Occupied(mut entry) => {
                tracing::warn!(
                    process_id = %process_id,
                    "Replacing process task that stopped without reporting a status"
                );
                let handle = self.spawn(process_id)?;
                entry.insert(Arc::clone(&handle));
                Ok(handle)
            }
            Entry::Vacant(entry) => {
                tracing::debug!(process_id = %process_id, "Spawning process task");
                let handle = self.spawn(process_id)?;
                entry.insert(Arc::clone(&handle));
                Ok(handle)
            }
        }
    }

    fn spawn(&self, process_id: &str) -> Result<Arc<ProcessHandle>> {
        let inbox = SignalInbox::new(process_id, Arc::clone(&self.services.store));
        let ctx = ProcessContext::load(self.services.clone(), process_id, inbox.clone())?;

        let (status_tx, status_rx) = watch::channel(ProcessStatus::Running);
        let handle = Arc::new(ProcessHandle::new(
            process_id.to_string(),
            ctx.order_id().to_string(),
            Arc::clone(ctx.state()),
            status_rx,
            inbox,
        ));

        let workflow = ResolveBrokenOrder::new(
            Arc::clone(&self.case_files),
            Arc::new(StrategyRegistry::from_config(
                &self.config,
                Arc::clone(&self.retrier),
            )),
        );
        let publisher = self.publisher.clone();

        let task = tokio::spawn(async move {
            let status = drive(workflow, ctx, publisher).await;
            let _ = status_tx.send(status);
        });
        handle.attach(task);
        Ok(handle)
    }
}

/// Run the workflow to completion and record how it ended
async fn drive(
    workflow: ResolveBrokenOrder,
    mut ctx: ProcessContext,
    publisher: EventPublisher,
) -> ProcessStatus {
    let process_id = ctx.process_id().to_string();
    let order_id = ctx.order_id().to_string();

    match workflow.run(&mut ctx).await {
        Ok(outcome) => match ctx.complete(outcome) {
            Ok(()) => {
                let outcome_name = outcome.to_string();
                log_process_operation(
                    "resolve",
                    &process_id,
                    Some(&order_id),
                    "completed",
                    Some(&outcome_name),
                );
                ProcessStatus::Completed(outcome)
            }
            Err(err) => {
                log_error("engine", "complete", &err.to_string(), Some(&process_id));
                ProcessStatus::Failed(err.to_string())
            }
        },
        // Divergent history is left untouched for inspection
        Err(err @ ResolutionError::Nondeterminism { .. }) => {
            log_error("engine", "replay", &err.to_string(), Some(&process_id));
            ProcessStatus::Failed(err.to_string())
        }
        Err(err) => {
            let reason = err.to_string();
            let was_replaying = ctx.is_replaying();
            if let Err(record_err) = ctx.fail(&reason) {
                log_error("engine", "fail", &record_err.to_string(), Some(&process_id));
            }
            log_process_operation("resolve", &process_id, Some(&order_id), "failed", Some(&reason));

            if !was_replaying {
                if let Err(publish_err) = publisher
                    .publish(
                        events::PROCESS_FAILED,
                        json!({
                            "process_id": process_id,
                            "order_id": order_id,
                            "reason": reason,
                        }),
                    )
                    .await
                {
                    tracing::warn!(process_id = %process_id, error = %publish_err, "Failed to publish process failure");
                }
            }
            ProcessStatus::Failed(reason)
        }
    }
}
