//! Remediation strategies keyed by issue type.
//!
//! `TRANSFER_FAILED` runs the business retry loop and escalates to a human
//! when it is exhausted. Issue types without a registered strategy fall
//! through to [`UnhandledIssueStrategy`], whose behavior is a configuration
//! choice.

use super::decision_gate::HumanDecisionGate;
use super::retry_controller::{RetryController, RetryOutcome};
use crate::activities::TransferRetrier;
use crate::config::{ResolutionConfig, UnhandledIssuePolicy};
use crate::constants::task_types;
use crate::error::Result;
use crate::models::{CaseFile, IssueType};
use crate::runtime::ProcessContext;
use crate::state_machine::ResolutionOutcome;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Drives a process from a built case file to its terminal outcome
#[async_trait]
pub trait IssueStrategy: Send + Sync {
    async fn resolve(
        &self,
        ctx: &mut ProcessContext,
        case_file: &CaseFile,
    ) -> Result<ResolutionOutcome>;

    /// Get a description of this strategy for logging
    fn name(&self) -> &'static str;
}

/// Retry the transfer, then escalate to a human
pub struct TransferFailedStrategy {
    retry: RetryController,
    gate: HumanDecisionGate,
}

impl TransferFailedStrategy {
    pub fn new(retry: RetryController, gate: HumanDecisionGate) -> Self {
        Self { retry, gate }
    }
}

#[async_trait]
impl IssueStrategy for TransferFailedStrategy {
    async fn resolve(
        &self,
        ctx: &mut ProcessContext,
        case_file: &CaseFile,
    ) -> Result<ResolutionOutcome> {
        match self.retry.run(ctx).await? {
            RetryOutcome::Succeeded { .. } => Ok(ResolutionOutcome::ResolvedAutomatically),
            RetryOutcome::Exhausted { attempts } => {
                self.gate
                    .escalate(
                        ctx,
                        task_types::RETRY_TRANSFER,
                        format!("Transfer for order {} needs review", case_file.order_id),
                        format!("Transfer not accepted after {attempts} attempts"),
                    )
                    .await
            }
        }
    }

    fn name(&self) -> &'static str {
        "transfer_failed_retry_then_escalate"
    }
}

/// Fallback for issue types with no remediation
pub struct UnhandledIssueStrategy {
    policy: UnhandledIssuePolicy,
    gate: HumanDecisionGate,
}

impl UnhandledIssueStrategy {
    pub fn new(policy: UnhandledIssuePolicy, gate: HumanDecisionGate) -> Self {
        Self { policy, gate }
    }
}

#[async_trait]
impl IssueStrategy for UnhandledIssueStrategy {
    async fn resolve(
        &self,
        ctx: &mut ProcessContext,
        case_file: &CaseFile,
    ) -> Result<ResolutionOutcome> {
        match self.policy {
            UnhandledIssuePolicy::Reject => {
                tracing::info!(
                    process_id = %ctx.process_id(),
                    issue_type = %case_file.issue_type,
                    "No remediation for issue type, rejecting"
                );
                Ok(ResolutionOutcome::EscalatedRejected)
            }
            UnhandledIssuePolicy::Escalate => {
                self.gate
                    .escalate(
                        ctx,
                        task_types::MANUAL_REVIEW,
                        format!("Order {} needs manual review", case_file.order_id),
                        format!("No automated remediation for {}", case_file.issue_type),
                    )
                    .await
            }
        }
    }

    fn name(&self) -> &'static str {
        match self.policy {
            UnhandledIssuePolicy::Reject => "unhandled_reject",
            UnhandledIssuePolicy::Escalate => "unhandled_escalate",
        }
    }
}

/// Strategies keyed by issue type with an explicit default
pub struct StrategyRegistry {
    strategies: HashMap<IssueType, Arc<dyn IssueStrategy>>,
    default: Arc<dyn IssueStrategy>,
}

impl StrategyRegistry {
    pub fn new(default: Arc<dyn IssueStrategy>) -> Self {
        Self {
            strategies: HashMap::new(),
            default,
        }
    }

    /// Standard registry: transfer failures retry then escalate; everything
    /// else follows `issues.unhandled_policy`
    pub fn from_config(config: &ResolutionConfig, retrier: Arc<dyn TransferRetrier>) -> Self {
        let gate = HumanDecisionGate::new(config.decision_gate.timeout());
        let default = Arc::new(UnhandledIssueStrategy::new(
            config.issues.unhandled_policy,
            gate.clone(),
        ));

        Self::new(default).register(
            IssueType::TransferFailed,
            Arc::new(TransferFailedStrategy::new(
                RetryController::new(retrier, config.retry.max_attempts),
                gate,
            )),
        )
    }

    pub fn register(mut self, issue_type: IssueType, strategy: Arc<dyn IssueStrategy>) -> Self {
        self.strategies.insert(issue_type, strategy);
        self
    }

    pub fn for_issue(&self, issue_type: IssueType) -> Arc<dyn IssueStrategy> {
        self.strategies
            .get(&issue_type)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.default))
    }
}
