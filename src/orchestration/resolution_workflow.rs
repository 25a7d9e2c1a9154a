use super::strategy::StrategyRegistry;
use crate::activities::CaseFileBuilder;
use crate::constants::actions;
use crate::error::Result;
use crate::models::CaseFile;
use crate::runtime::ProcessContext;
use crate::state_machine::{ResolutionEvent, ResolutionOutcome};
use std::sync::Arc;

/// The broken-order resolution workflow.
///
/// Builds the case file, hands it to the strategy registered for its issue
/// type and records the terminal outcome. The same code path serves live
/// execution and replay; `ProcessContext` decides which applies.
pub struct ResolveBrokenOrder {
    case_files: Arc<dyn CaseFileBuilder>,
    strategies: Arc<StrategyRegistry>,
}

impl ResolveBrokenOrder {
    pub fn new(case_files: Arc<dyn CaseFileBuilder>, strategies: Arc<StrategyRegistry>) -> Self {
        Self {
            case_files,
            strategies,
        }
    }

    pub async fn run(&self, ctx: &mut ProcessContext) -> Result<ResolutionOutcome> {
        let order_id = ctx.order_id().to_string();

        let builder = &self.case_files;
        let order = order_id.as_str();
        let case_file: CaseFile = ctx
            .execute_action(actions::BUILD_CASE_FILE, order, move || async move {
                builder.build_case_file(order).await
            })
            .await?;

        let at = ctx.now();
        ctx.record(ResolutionEvent::CaseFileBuilt {
            case_file: case_file.clone(),
            at,
        })
        .await?;

        let strategy = self.strategies.for_issue(case_file.issue_type);
        tracing::debug!(
            process_id = %ctx.process_id(),
            issue_type = %case_file.issue_type,
            strategy = strategy.name(),
            "Selected remediation strategy"
        );

        let outcome = strategy.resolve(ctx, &case_file).await?;

        let at = ctx.now();
        ctx.record(ResolutionEvent::Resolved { outcome, at }).await?;
        Ok(outcome)
    }
}
