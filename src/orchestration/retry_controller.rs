use crate::activities::{IdempotencyKey, TransferRetrier};
use crate::constants::actions;
use crate::error::Result;
use crate::models::TransferStatus;
use crate::runtime::ProcessContext;
use crate::state_machine::ResolutionEvent;
use std::sync::Arc;

/// Result of the business retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The transfer is accepted; `attempts` business attempts were made
    Succeeded { attempts: u32 },
    /// All attempts returned `NOT_ACCEPTED`
    Exhausted { attempts: u32 },
}

/// Bounded business retry loop for failed transfers.
///
/// Issues attempts sequentially up to `max_attempts`, stopping as soon as
/// the transfer status is `ACCEPTED`. Per-call retries are the invocation
/// policy's concern, not this loop's.
pub struct RetryController {
    retrier: Arc<dyn TransferRetrier>,
    max_attempts: u32,
}

impl RetryController {
    pub fn new(retrier: Arc<dyn TransferRetrier>, max_attempts: u32) -> Self {
        Self {
            retrier,
            max_attempts,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub async fn run(&self, ctx: &mut ProcessContext) -> Result<RetryOutcome> {
        let order_id = ctx.order_id().to_string();
        let first_attempt = ctx.state().read().case_file.attempt_count + 1;

        for attempt in first_attempt..=self.max_attempts {
            if ctx.state().read().case_file.transfer_status.is_accepted() {
                return Ok(RetryOutcome::Succeeded {
                    attempts: attempt - 1,
                });
            }

            let key = IdempotencyKey::new(order_id.as_str(), attempt);
            let retrier = &self.retrier;
            let call_key = &key;
            let status: TransferStatus = ctx
                .execute_action(actions::RETRY_TRANSFER, &key.to_string(), move || async move {
                    retrier.retry_transfer(call_key).await
                })
                .await?;

            let at = ctx.now();
            ctx.record(ResolutionEvent::RetryAttempted {
                attempt,
                status,
                at,
            })
            .await?;

            tracing::debug!(
                process_id = %ctx.process_id(),
                attempt = attempt,
                status = %status,
                "Business retry attempt recorded"
            );

            if status.is_accepted() {
                return Ok(RetryOutcome::Succeeded { attempts: attempt });
            }
        }

        let case_file = ctx.state().read().case_file.clone();
        if case_file.transfer_status.is_accepted() {
            Ok(RetryOutcome::Succeeded {
                attempts: case_file.attempt_count,
            })
        } else {
            Ok(RetryOutcome::Exhausted {
                attempts: case_file.attempt_count,
            })
        }
    }
}
