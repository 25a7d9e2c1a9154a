//! Mock collaborators for demos and tests.
//!
//! `MockCaseFileBuilder` classifies orders whose id contains `PAYMENT` as
//! `PAYMENT_FAILED` and everything else as `TRANSFER_FAILED`.
//! `MockTransferRetrier` never accepts orders whose id contains `FAIL`
//! (case-insensitive) and accepts every other order from attempt 2 on.
//! Both can be scripted to fail specific calls.

use super::{ActionError, CaseFileBuilder, IdempotencyKey, TransferRetrier};
use crate::models::{CaseFile, IssueType, TransferStatus};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::VecDeque;

const MOCK_BUYER_EMAIL: &str = "buyer@example.com";

/// Scripted failures keyed by order id, consumed front to back
#[derive(Debug, Default)]
struct FailureScript {
    queued: DashMap<String, VecDeque<ActionError>>,
}

impl FailureScript {
    fn push(&self, order_id: &str, error: ActionError) {
        self.queued
            .entry(order_id.to_string())
            .or_default()
            .push_back(error);
    }

    fn next(&self, order_id: &str) -> Option<ActionError> {
        self.queued
            .get_mut(order_id)
            .and_then(|mut queue| queue.pop_front())
    }
}

#[derive(Debug, Default)]
pub struct MockCaseFileBuilder {
    calls: DashMap<String, u32>,
    failures: FailureScript,
}

impl MockCaseFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next call for `order_id` with `error`
    pub fn fail_next(&self, order_id: &str, error: ActionError) -> &Self {
        self.failures.push(order_id, error);
        self
    }

    /// Number of invocations observed for `order_id`, failed ones included
    pub fn calls_for(&self, order_id: &str) -> u32 {
        self.calls.get(order_id).map(|c| *c).unwrap_or(0)
    }
}

#[async_trait]
impl CaseFileBuilder for MockCaseFileBuilder {
    async fn build_case_file(&self, order_id: &str) -> Result<CaseFile, ActionError> {
        *self.calls.entry(order_id.to_string()).or_insert(0) += 1;

        if let Some(error) = self.failures.next(order_id) {
            tracing::debug!(order_id, error = %error, "mock case file builder failing");
            return Err(error);
        }

        let issue_type = if order_id.to_uppercase().contains("PAYMENT") {
            IssueType::PaymentFailed
        } else {
            IssueType::TransferFailed
        };

        Ok(CaseFile {
            order_id: order_id.to_string(),
            issue_type,
            buyer_email: MOCK_BUYER_EMAIL.to_string(),
            transfer_status: TransferStatus::NotAccepted,
            attempt_count: 0,
            generated_at: Some(Utc::now()),
        })
    }
}

#[derive(Debug, Default)]
pub struct MockTransferRetrier {
    results: DashMap<IdempotencyKey, TransferStatus>,
    invocations: DashMap<String, u32>,
    failures: FailureScript,
}

impl MockTransferRetrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next call for `order_id` with `error`
    pub fn fail_next(&self, order_id: &str, error: ActionError) -> &Self {
        self.failures.push(order_id, error);
        self
    }

    /// Number of invocations observed for `order_id`, failed ones included
    pub fn calls_for(&self, order_id: &str) -> u32 {
        self.invocations.get(order_id).map(|c| *c).unwrap_or(0)
    }

    /// Distinct attempts that produced a status for `order_id`
    pub fn attempts_for(&self, order_id: &str) -> usize {
        self.results
            .iter()
            .filter(|entry| entry.key().order_id == order_id)
            .count()
    }

    fn decide(key: &IdempotencyKey) -> TransferStatus {
        if key.order_id.to_uppercase().contains("FAIL") {
            TransferStatus::NotAccepted
        } else if key.attempt >= 2 {
            TransferStatus::Accepted
        } else {
            TransferStatus::NotAccepted
        }
    }
}

#[async_trait]
impl TransferRetrier for MockTransferRetrier {
    async fn retry_transfer(&self, key: &IdempotencyKey) -> Result<TransferStatus, ActionError> {
        *self.invocations.entry(key.order_id.clone()).or_insert(0) += 1;

        if let Some(error) = self.failures.next(&key.order_id) {
            tracing::debug!(key = %key, error = %error, "mock transfer retrier failing");
            return Err(error);
        }

        let status = *self
            .results
            .entry(key.clone())
            .or_insert_with(|| Self::decide(key));

        tracing::debug!(key = %key, status = %status, "mock transfer retry");
        Ok(status)
    }
}
