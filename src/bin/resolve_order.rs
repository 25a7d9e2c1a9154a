//! # Order Resolution Starter
//!
//! Starts a resolution process for one order against the mock collaborators,
//! optionally answers its escalation, and prints the outcome and audit log.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use order_resolution::activities::{MockCaseFileBuilder, MockTransferRetrier};
use order_resolution::constants::events;
use order_resolution::logging::init_structured_logging;
use order_resolution::{ConfigManager, ProcessHandle, ResolutionEngine, TaskDecision};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

#[derive(Parser)]
#[command(name = "resolve-order")]
#[command(about = "Resolve a broken order and print its audit log")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Order id to resolve (ids containing FAIL never get the transfer accepted)
    #[arg(short, long)]
    order: String,

    /// Answer to submit if the process escalates to a human
    #[arg(short, long, value_enum)]
    decision: Option<Decision>,

    /// Who the decision is recorded as coming from
    #[arg(long, default_value = "resolve-order-cli")]
    decider: String,

    /// Configuration directory (default: ./config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Decision {
    Approve,
    Reject,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_structured_logging();
    let cli = Cli::parse();

    let manager = ConfigManager::load_from_directory(cli.config_dir.clone())
        .context("failed to load configuration")?;
    info!(environment = %manager.environment(), "Configuration loaded");

    let engine = ResolutionEngine::new(
        manager.config().clone(),
        Arc::new(MockCaseFileBuilder::new()),
        Arc::new(MockTransferRetrier::new()),
    );

    let mut lifecycle = engine.event_publisher().subscribe();
    let process = engine
        .start(&cli.order)
        .await
        .with_context(|| format!("failed to start resolution for {}", cli.order))?;

    let escalated = loop {
        tokio::select! {
            status = process.wait_for_outcome() => {
                status?;
                break false;
            }
            received = lifecycle.recv() => match received {
                Ok(event)
                    if event.name == events::TASK_CREATED
                        && event.context["process_id"] == process.process_id() =>
                {
                    break true;
                }
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break false,
            },
        }
    };

    if escalated {
        match cli.decision {
            Some(decision) => submit_decision(&process, decision, &cli.decider)?,
            None => {
                print_report(&process, "awaiting_decision")?;
                return Ok(());
            }
        }
    }

    let status = process.wait_for_outcome().await?;
    print_report(&process, &status.to_string())
}

fn submit_decision(process: &ProcessHandle, decision: Decision, decider: &str) -> Result<()> {
    let task = process
        .pending_task()
        .context("process escalated but reports no pending task")?;

    let approved = matches!(decision, Decision::Approve);
    info!(task_id = %task.id, approved, "Submitting decision");
    process.signal_task_decision(TaskDecision {
        task_id: task.id,
        approved,
        notes: "submitted from resolve-order".to_string(),
        decider: decider.to_string(),
        decided_at: Utc::now(),
    })?;
    Ok(())
}

fn print_report(process: &ProcessHandle, status: &str) -> Result<()> {
    let report = json!({
        "processId": process.process_id(),
        "orderId": process.order_id(),
        "status": status,
        "caseFile": process.casefile(),
        "pendingTask": process.pending_task(),
        "auditLog": process.audit_log(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
