//! Crash recovery and history replay

use crate::common::{decision, fast_config, wait_for_pending_task, TestHarness};
use order_resolution::runtime::{HistoryEvent, HistoryStore};
use order_resolution::state_machine::ProcessState;
use futures::future::join_all;
use order_resolution::{AuditKind, ProcessStatus, ResolutionError, ResolutionOutcome};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_replaying_recorded_events_reproduces_final_state() {
    let harness = TestHarness::new();
    let process = harness.engine.start("ORDER-FAIL").await.unwrap();
    let task = wait_for_pending_task(&process).await;
    process
        .signal_task_decision(decision(&task.id, false))
        .unwrap();
    process.wait_for_outcome().await.unwrap();

    let events = harness.recorded_events(process.process_id());
    let rebuilt = ProcessState::replay(process.process_id(), process.order_id(), &events).unwrap();

    assert_eq!(rebuilt, process.snapshot());
    // Replaying twice gives the same result
    let again = ProcessState::replay(process.process_id(), process.order_id(), &events).unwrap();
    assert_eq!(again, rebuilt);
}

#[tokio::test]
async fn test_recovery_does_not_repeat_completed_actions() {
    let first = TestHarness::new();
    let process = first.engine.start("ORDER-FAIL").await.unwrap();
    let process_id = process.process_id().to_string();
    wait_for_pending_task(&process).await;
    let audit_before_crash = process.audit_log();
    first.engine.shutdown();

    // Fresh collaborators over the surviving history
    let second = TestHarness::with_store(fast_config(), first.store.clone());
    assert!(matches!(
        second.engine.handle(&process_id),
        Err(ResolutionError::ProcessNotFound { .. })
    ));

    // Delivered while nothing runs the process; kept until recovery
    second
        .engine
        .signal_task_decision(&process_id, decision("task-ORDER-FAIL", true))
        .unwrap();
    assert_eq!(second.store.pending_signals(&process_id).unwrap().len(), 1);

    let recovered = second.engine.recover(&process_id).unwrap();
    assert_eq!(
        recovered.wait_for_outcome().await.unwrap(),
        ProcessStatus::Completed(ResolutionOutcome::EscalatedApproved)
    );

    assert_eq!(second.case_files.calls_for("ORDER-FAIL"), 0);
    assert_eq!(second.retrier.calls_for("ORDER-FAIL"), 0);

    let audit = recovered.audit_log();
    assert_eq!(&audit.entries()[..5], audit_before_crash.entries());
    assert_eq!(
        &audit.kinds()[5..],
        &[AuditKind::DecisionReceived, AuditKind::Resolved]
    );
}

#[tokio::test]
async fn test_recovering_a_finished_process_replays_without_side_effects() {
    let first = TestHarness::new();
    let process = first.engine.start("ORDER-OK").await.unwrap();
    let status = process.wait_for_outcome().await.unwrap();
    let process_id = process.process_id().to_string();
    let history_len = first.history(&process_id).len();
    first.engine.shutdown();

    let second = TestHarness::with_store(fast_config(), first.store.clone());
    let recovered = second.engine.recover(&process_id).unwrap();

    assert_eq!(recovered.wait_for_outcome().await.unwrap(), status);
    assert_eq!(recovered.snapshot(), process.snapshot());
    assert_eq!(second.history(&process_id).len(), history_len);
    assert_eq!(second.engine.event_publisher().published_count(), 0);
    assert_eq!(second.retrier.calls_for("ORDER-OK"), 0);
}

#[tokio::test]
async fn test_recover_all_resumes_every_stored_process() {
    let first = TestHarness::new();
    let waiting = first.engine.start("ORDER-FAIL-1").await.unwrap();
    let done = first.engine.start("ORDER-OK-2").await.unwrap();
    wait_for_pending_task(&waiting).await;
    done.wait_for_outcome().await.unwrap();
    first.engine.shutdown();

    let second = TestHarness::with_store(fast_config(), first.store.clone());
    let recovered = second.engine.recover_all().unwrap();
    assert_eq!(recovered.len(), 2);

    assert_eq!(
        second
            .engine
            .wait_for_outcome("resolve-ORDER-OK-2")
            .await
            .unwrap(),
        ProcessStatus::Completed(ResolutionOutcome::ResolvedAutomatically)
    );

    let task = wait_for_pending_task(&second.engine.handle("resolve-ORDER-FAIL-1").unwrap()).await;
    second
        .engine
        .signal_task_decision("resolve-ORDER-FAIL-1", decision(&task.id, false))
        .unwrap();
    assert_eq!(
        second
            .engine
            .wait_for_outcome("resolve-ORDER-FAIL-1")
            .await
            .unwrap(),
        ProcessStatus::Completed(ResolutionOutcome::PendingManualReview)
    );
}

#[tokio::test]
async fn test_changed_workflow_is_reported_as_nondeterminism() {
    let first = TestHarness::new();
    let process = first.engine.start("ORDER-FAIL").await.unwrap();
    let process_id = process.process_id().to_string();
    wait_for_pending_task(&process).await;
    first.engine.shutdown();
    let history_before = first.history(&process_id);

    // Fewer business attempts than the history was recorded with
    let mut config = fast_config();
    config.retry.max_attempts = 2;
    let second = TestHarness::with_store(config, first.store.clone());
    let recovered = second.engine.recover(&process_id).unwrap();

    match recovered.wait_for_outcome().await.unwrap() {
        ProcessStatus::Failed(reason) => assert!(reason.contains("Nondeterminism"), "{reason}"),
        other => panic!("expected nondeterminism failure, got {other}"),
    }
    assert_eq!(second.history(&process_id), history_before);
    assert_eq!(second.retrier.calls_for("ORDER-FAIL"), 0);
}

#[tokio::test]
async fn test_history_starts_with_process_started_and_ends_with_completion() {
    let harness = TestHarness::new();
    let process = harness.engine.start("ORDER-OK").await.unwrap();
    process.wait_for_outcome().await.unwrap();

    let history = harness.history(process.process_id());
    assert!(matches!(
        history.first(),
        Some(HistoryEvent::ProcessStarted { order_id, .. }) if order_id == "ORDER-OK"
    ));
    assert!(matches!(
        history.last(),
        Some(HistoryEvent::ProcessCompleted {
            outcome: ResolutionOutcome::ResolvedAutomatically,
            ..
        })
    ));

    let stamps: Vec<_> = history.iter().map(HistoryEvent::at).collect();
    assert!(stamps.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn test_recover_replaces_an_aborted_task() {
    let harness = TestHarness::new();
    let process = harness.engine.start("ORDER-FAIL").await.unwrap();
    let process_id = process.process_id().to_string();
    wait_for_pending_task(&process).await;

    process.abort();
    assert!(process.is_stale());
    assert_err!(process.wait_for_outcome().await);

    let recovered = assert_ok!(harness.engine.recover(&process_id));
    assert!(!Arc::ptr_eq(&process, &recovered));
    assert!(!recovered.is_stale());
    assert!(Arc::ptr_eq(
        &recovered,
        &harness.engine.handle(&process_id).unwrap()
    ));

    harness
        .engine
        .signal_task_decision(&process_id, decision("task-ORDER-FAIL", true))
        .unwrap();
    assert_eq!(
        recovered.wait_for_outcome().await.unwrap(),
        ProcessStatus::Completed(ResolutionOutcome::EscalatedApproved)
    );
    // Replay served every completed attempt from history
    assert_eq!(harness.retrier.calls_for("ORDER-FAIL"), 3);
    assert_eq!(harness.case_files.calls_for("ORDER-FAIL"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_recovery_spawns_a_single_driver() {
    let first = TestHarness::new();
    let process = first.engine.start("ORDER-FAIL").await.unwrap();
    let process_id = process.process_id().to_string();
    wait_for_pending_task(&process).await;
    first.engine.shutdown();

    let second = Arc::new(TestHarness::with_store(fast_config(), first.store.clone()));
    let recoveries = (0..8).map(|_| {
        let harness = Arc::clone(&second);
        let process_id = process_id.clone();
        tokio::task::spawn_blocking(move || harness.engine.recover(&process_id))
    });
    let handles: Vec<_> = join_all(recoveries)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();
    assert!(handles.iter().all(|handle| Arc::ptr_eq(handle, &handles[0])));

    let task = wait_for_pending_task(&handles[0]).await;
    second
        .engine
        .signal_task_decision(&process_id, decision(&task.id, false))
        .unwrap();
    assert_eq!(
        handles[0].wait_for_outcome().await.unwrap(),
        ProcessStatus::Completed(ResolutionOutcome::PendingManualReview)
    );

    let history = second.history(&process_id);
    let decisions = history
        .iter()
        .filter(|event| matches!(event, HistoryEvent::SignalReceived { .. }))
        .count();
    let completions = history.iter().filter(|event| event.is_terminal()).count();
    assert_eq!(decisions, 1);
    assert_eq!(completions, 1);
}
