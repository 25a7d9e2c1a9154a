//! End-to-end resolution scenarios against the mock collaborators

use crate::common::{
    decision, fast_config, wait_for_pending_task, ScriptedCaseFileBuilder, TestHarness,
};
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use futures::future::join_all;
use order_resolution::activities::{ActionError, MockTransferRetrier};
use order_resolution::config::UnhandledIssuePolicy;
use order_resolution::constants::actions;
use order_resolution::runtime::{HistoryEvent, HistoryStore, SteppingTimeSource};
use order_resolution::{
    AuditKind, IssueType, ProcessStatus, ResolutionEngine, ResolutionError, ResolutionOutcome,
    TransferStatus,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_transfer_accepted_on_second_attempt() {
    let harness = TestHarness::new();
    let process = harness.engine.start("ORDER-OK").await.unwrap();

    let status = process.wait_for_outcome().await.unwrap();
    assert_eq!(
        status,
        ProcessStatus::Completed(ResolutionOutcome::ResolvedAutomatically)
    );

    let audit = process.audit_log();
    assert_eq!(
        audit.kinds(),
        vec![
            AuditKind::CasefileBuilt,
            AuditKind::RetryTransfer,
            AuditKind::RetryTransfer,
            AuditKind::Resolved,
        ]
    );
    let entries = audit.entries();
    assert_eq!(entries[1].data["attempt"], 1);
    assert_eq!(entries[1].data["status"], "NOT_ACCEPTED");
    assert_eq!(entries[2].data["attempt"], 2);
    assert_eq!(entries[2].data["status"], "ACCEPTED");
    assert_eq!(entries[3].data["outcome"], "RESOLVED_AUTOMATICALLY");

    let case_file = process.casefile();
    assert_eq!(case_file.order_id, "ORDER-OK");
    assert_eq!(case_file.issue_type, IssueType::TransferFailed);
    assert_eq!(case_file.transfer_status, TransferStatus::Accepted);
    assert_eq!(case_file.attempt_count, 2);

    assert!(process.pending_task().is_none());
    assert_eq!(harness.retrier.calls_for("ORDER-OK"), 2);
}

#[tokio::test]
async fn test_exhausted_retries_escalate_and_approval_resolves() {
    let harness = TestHarness::new();
    let process = harness.engine.start("ORDER-FAIL").await.unwrap();

    let task = wait_for_pending_task(&process).await;
    assert_eq!(task.id, "task-ORDER-FAIL");
    assert_eq!(task.task_type, "RETRY_TRANSFER");
    assert_eq!(task.order_id, "ORDER-FAIL");
    assert_eq!(
        process.audit_log().kinds(),
        vec![
            AuditKind::CasefileBuilt,
            AuditKind::RetryTransfer,
            AuditKind::RetryTransfer,
            AuditKind::RetryTransfer,
            AuditKind::TaskCreated,
        ]
    );
    assert_eq!(process.status(), ProcessStatus::Running);
    assert_eq!(
        harness.engine.pending_task(process.process_id()).unwrap(),
        Some(task.clone())
    );

    harness
        .engine
        .signal_task_decision(process.process_id(), decision(&task.id, true))
        .unwrap();

    let status = process.wait_for_outcome().await.unwrap();
    assert_eq!(
        status,
        ProcessStatus::Completed(ResolutionOutcome::EscalatedApproved)
    );

    let audit = process.audit_log();
    let kinds = audit.kinds();
    assert_eq!(
        &kinds[5..],
        &[AuditKind::DecisionReceived, AuditKind::Resolved]
    );
    assert_eq!(audit.entries()[5].data["approved"], true);
    assert_eq!(audit.entries()[5].data["decider"], "ops@example.com");
    assert!(process.pending_task().is_none());
    assert_eq!(process.casefile().attempt_count, 3);
    assert_eq!(harness.retrier.calls_for("ORDER-FAIL"), 3);
}

#[tokio::test]
async fn test_rejected_escalation_needs_manual_review() {
    let harness = TestHarness::new();
    let process = harness.engine.start("ORDER-FAIL").await.unwrap();

    let task = wait_for_pending_task(&process).await;
    process
        .signal_task_decision(decision(&task.id, false))
        .unwrap();

    let status = process.wait_for_outcome().await.unwrap();
    assert_eq!(
        status,
        ProcessStatus::Completed(ResolutionOutcome::PendingManualReview)
    );

    let snapshot = process.snapshot();
    assert_eq!(snapshot.last_decision.map(|d| d.approved), Some(false));
    assert_eq!(
        process.audit_log().last().unwrap().data["outcome"],
        "PENDING_MANUAL_REVIEW"
    );
}

#[tokio::test]
async fn test_mismatched_decision_is_ignored() {
    let harness = TestHarness::new();
    let process = harness.engine.start("ORDER-FAIL").await.unwrap();
    let task = wait_for_pending_task(&process).await;
    let audit_before = process.audit_log();

    process
        .signal_task_decision(decision("task-SOMETHING-ELSE", true))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(process.status(), ProcessStatus::Running);
    assert_eq!(process.audit_log(), audit_before);
    assert_eq!(process.pending_task(), Some(task.clone()));

    process
        .signal_task_decision(decision(&task.id, true))
        .unwrap();
    assert_eq!(
        process.wait_for_outcome().await.unwrap(),
        ProcessStatus::Completed(ResolutionOutcome::EscalatedApproved)
    );
}

#[tokio::test]
async fn test_decision_sent_before_the_gate_opens_is_kept() {
    let harness = TestHarness::new();
    let process = harness.engine.start("ORDER-FAIL-EARLY").await.unwrap();

    // The task id is derived from the order, so it can be addressed up front
    process
        .signal_task_decision(decision("task-ORDER-FAIL-EARLY", true))
        .unwrap();

    assert_eq!(
        process.wait_for_outcome().await.unwrap(),
        ProcessStatus::Completed(ResolutionOutcome::EscalatedApproved)
    );
    assert!(process
        .audit_log()
        .kinds()
        .contains(&AuditKind::DecisionReceived));
}

#[tokio::test]
async fn test_unhandled_issue_rejected_without_remediation() {
    let harness = TestHarness::new();
    let process = harness.engine.start("ORDER-PAYMENT-7").await.unwrap();

    assert_eq!(
        process.wait_for_outcome().await.unwrap(),
        ProcessStatus::Completed(ResolutionOutcome::EscalatedRejected)
    );

    let audit = process.audit_log();
    assert_eq!(
        audit.kinds(),
        vec![AuditKind::CasefileBuilt, AuditKind::Resolved]
    );
    assert_eq!(audit.entries()[1].data["outcome"], "ESCALATED_REJECTED");
    assert_eq!(audit.entries()[1].data["remediationAttempted"], false);
    assert_eq!(process.casefile().issue_type, IssueType::PaymentFailed);
    assert!(process.pending_task().is_none());
    assert_eq!(harness.retrier.calls_for("ORDER-PAYMENT-7"), 0);
}

#[tokio::test]
async fn test_unhandled_issue_escalated_for_manual_review() {
    let mut config = fast_config();
    config.issues.unhandled_policy = UnhandledIssuePolicy::Escalate;
    let harness = TestHarness::with_config(config);
    let process = harness.engine.start("ORDER-PAYMENT-8").await.unwrap();

    let task = wait_for_pending_task(&process).await;
    assert_eq!(task.task_type, "MANUAL_REVIEW");
    assert_eq!(task.id, "task-ORDER-PAYMENT-8");

    process
        .signal_task_decision(decision(&task.id, true))
        .unwrap();
    assert_eq!(
        process.wait_for_outcome().await.unwrap(),
        ProcessStatus::Completed(ResolutionOutcome::EscalatedApproved)
    );
    assert_eq!(
        process.audit_log().kinds(),
        vec![
            AuditKind::CasefileBuilt,
            AuditKind::TaskCreated,
            AuditKind::DecisionReceived,
            AuditKind::Resolved,
        ]
    );
    assert_eq!(harness.retrier.calls_for("ORDER-PAYMENT-8"), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_processes_are_isolated() {
    let harness = TestHarness::new();
    let order_ids: Vec<String> = (0..8)
        .map(|i| {
            if i % 2 == 0 {
                format!("ORDER-OK-{i}")
            } else {
                format!("ORDER-FAIL-{i}")
            }
        })
        .collect();

    let started = join_all(order_ids.iter().map(|id| harness.engine.start(id))).await;
    let processes: Vec<_> = started.into_iter().map(Result::unwrap).collect();

    for process in processes.iter().filter(|p| p.order_id().contains("FAIL")) {
        let task = wait_for_pending_task(process).await;
        assert_eq!(task.order_id, process.order_id());
        process
            .signal_task_decision(decision(&task.id, true))
            .unwrap();
    }

    for process in &processes {
        let status = process.wait_for_outcome().await.unwrap();
        let expected = if process.order_id().contains("FAIL") {
            ResolutionOutcome::EscalatedApproved
        } else {
            ResolutionOutcome::ResolvedAutomatically
        };
        assert_eq!(status, ProcessStatus::Completed(expected));

        let case_file = process.casefile();
        assert_eq!(case_file.order_id, process.order_id());
        let audit = process.audit_log();
        assert_eq!(audit.entries()[0].data["orderId"], process.order_id());
        let retries = audit
            .kinds()
            .into_iter()
            .filter(|kind| *kind == AuditKind::RetryTransfer)
            .count();
        assert_eq!(retries, case_file.attempt_count as usize);
    }
}

#[tokio::test]
async fn test_duplicate_start_is_rejected() {
    let harness = TestHarness::new();
    let process = harness.engine.start("ORDER-OK").await.unwrap();

    let duplicate = harness.engine.start("ORDER-OK").await;
    assert!(matches!(
        duplicate,
        Err(ResolutionError::AlreadyStarted { ref process_id }) if process_id == "resolve-ORDER-OK"
    ));

    process.wait_for_outcome().await.unwrap();
    assert!(matches!(
        harness.engine.start("ORDER-OK").await,
        Err(ResolutionError::AlreadyStarted { .. })
    ));
    assert_eq!(harness.case_files.calls_for("ORDER-OK"), 1);
}

#[tokio::test]
async fn test_signal_after_completion_is_rejected() {
    let harness = TestHarness::new();
    let process = harness.engine.start("ORDER-OK").await.unwrap();
    process.wait_for_outcome().await.unwrap();

    let result = process.signal_task_decision(decision("task-ORDER-OK", true));
    assert!(matches!(
        result,
        Err(ResolutionError::ProcessTerminated { .. })
    ));
}

#[tokio::test]
async fn test_transient_case_file_failure_is_retried() {
    let harness = TestHarness::new();
    harness.case_files.fail_next(
        "ORDER-OK",
        ActionError::Transient("case service unavailable".to_string()),
    );

    let process = harness.engine.start("ORDER-OK").await.unwrap();
    assert_eq!(
        process.wait_for_outcome().await.unwrap(),
        ProcessStatus::Completed(ResolutionOutcome::ResolvedAutomatically)
    );
    assert_eq!(harness.case_files.calls_for("ORDER-OK"), 2);

    let build_attempts: Vec<u32> = harness
        .history(process.process_id())
        .into_iter()
        .filter_map(|event| match event {
            HistoryEvent::ActionCompleted {
                action, attempts, ..
            } if action == actions::BUILD_CASE_FILE => Some(attempts),
            _ => None,
        })
        .collect();
    assert_eq!(build_attempts, vec![2]);
}

#[tokio::test]
async fn test_permanent_action_failure_fails_the_process() {
    let harness = TestHarness::new();
    harness.case_files.fail_next(
        "ORDER-OK",
        ActionError::Permanent("order archived".to_string()),
    );

    let process = harness.engine.start("ORDER-OK").await.unwrap();
    let status = process.wait_for_outcome().await.unwrap();

    match status {
        ProcessStatus::Failed(reason) => assert!(reason.contains("order archived")),
        other => panic!("expected failure, got {other}"),
    }
    assert!(process.audit_log().is_empty());
    assert!(process.pending_task().is_none());
    assert!(!process.casefile().is_built());
    assert!(matches!(
        harness.history(process.process_id()).last(),
        Some(HistoryEvent::ProcessFailed { .. })
    ));
}

#[tokio::test]
async fn test_exhausted_invocation_policy_keeps_last_recorded_state() {
    let harness = TestHarness::new();
    for _ in 0..3 {
        harness.retrier.fail_next(
            "ORDER-OK",
            ActionError::Transient("transfer service timeout".to_string()),
        );
    }

    let process = harness.engine.start("ORDER-OK").await.unwrap();
    let status = process.wait_for_outcome().await.unwrap();

    assert!(matches!(status, ProcessStatus::Failed(_)));
    assert_eq!(process.audit_log().kinds(), vec![AuditKind::CasefileBuilt]);
    assert!(process.pending_task().is_none());
    assert_eq!(harness.retrier.calls_for("ORDER-OK"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_gate_deadline_resolves_for_manual_review() {
    let origin = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut config = fast_config();
    config.decision_gate.timeout_seconds = Some(3_600);

    let harness = TestHarness::with_config(config).with_time_source(Arc::new(
        SteppingTimeSource::new(origin, ChronoDuration::seconds(1)),
    ));

    let process = harness.engine.start("ORDER-FAIL").await.unwrap();
    let status = process.wait_for_outcome().await.unwrap();
    assert_eq!(
        status,
        ProcessStatus::Completed(ResolutionOutcome::PendingManualReview)
    );

    let audit = process.audit_log();
    let kinds = audit.kinds();
    assert_eq!(
        &kinds[4..],
        &[
            AuditKind::TaskCreated,
            AuditKind::DecisionTimedOut,
            AuditKind::Resolved,
        ]
    );

    let created_at = audit.entries()[4].at;
    let timed_out_at = audit.entries()[5].at;
    assert!(created_at >= origin);
    assert!(timed_out_at >= created_at + ChronoDuration::seconds(3_600));
    assert!(process.pending_task().is_none());
    assert!(process.snapshot().decision_timed_out);
}

#[tokio::test]
async fn test_already_accepted_transfer_skips_retries() {
    let case_files = Arc::new(ScriptedCaseFileBuilder::new(TransferStatus::Accepted, 0));
    let retrier = Arc::new(MockTransferRetrier::new());
    let engine = ResolutionEngine::new(fast_config(), case_files.clone(), retrier.clone());

    let process = engine.start("ORDER-SETTLED").await.unwrap();
    assert_eq!(
        process.wait_for_outcome().await.unwrap(),
        ProcessStatus::Completed(ResolutionOutcome::ResolvedAutomatically)
    );

    assert_eq!(case_files.calls(), 1);
    assert_eq!(retrier.calls_for("ORDER-SETTLED"), 0);
    assert_eq!(
        process.audit_log().kinds(),
        vec![AuditKind::CasefileBuilt, AuditKind::Resolved]
    );
    assert_eq!(process.casefile().attempt_count, 0);
}

#[tokio::test]
async fn test_retries_resume_after_previous_attempts() {
    let case_files = Arc::new(ScriptedCaseFileBuilder::new(TransferStatus::NotAccepted, 2));
    let retrier = Arc::new(MockTransferRetrier::new());
    let engine = ResolutionEngine::new(fast_config(), case_files, retrier.clone());

    let process = engine.start("ORDER-RESUME").await.unwrap();
    assert_eq!(
        process.wait_for_outcome().await.unwrap(),
        ProcessStatus::Completed(ResolutionOutcome::ResolvedAutomatically)
    );

    assert_eq!(retrier.calls_for("ORDER-RESUME"), 1);
    let audit = process.audit_log();
    assert_eq!(
        audit.kinds(),
        vec![
            AuditKind::CasefileBuilt,
            AuditKind::RetryTransfer,
            AuditKind::Resolved,
        ]
    );
    assert_eq!(audit.entries()[1].data["attempt"], 3);
    assert_eq!(process.casefile().attempt_count, 3);

    let keys: Vec<_> = engine
        .store()
        .read_history(process.process_id())
        .unwrap()
        .into_iter()
        .filter_map(|event| match event {
            HistoryEvent::ActionCompleted { action, key, .. } if action == actions::RETRY_TRANSFER => {
                Some(key)
            }
            _ => None,
        })
        .collect();
    assert_eq!(keys, vec!["ORDER-RESUME:retry-transfer:3".to_string()]);
}

#[tokio::test]
async fn test_unrepresentable_gate_deadline_fails_the_process() {
    let mut config = fast_config();
    config.decision_gate.timeout_seconds = Some(10_000_000_000_000);
    let harness = TestHarness::with_config(config);

    let process = harness.engine.start("ORDER-FAIL").await.unwrap();
    let status = tokio::time::timeout(Duration::from_secs(5), process.wait_for_outcome())
        .await
        .unwrap()
        .unwrap();

    match status {
        ProcessStatus::Failed(reason) => {
            assert!(reason.contains("decision_gate.timeout_seconds"), "{reason}")
        }
        other => panic!("expected failure, got {other}"),
    }
    assert!(matches!(
        harness.history(process.process_id()).last(),
        Some(HistoryEvent::ProcessFailed { .. })
    ));
}
