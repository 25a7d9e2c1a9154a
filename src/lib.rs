#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Order Resolution Core
//!
//! Durable, replayable case-resolution workflow for broken e-commerce orders.
//!
//! ## Overview
//!
//! Given an order id, a resolution process builds a diagnostic case file,
//! attempts automated remediation through a bounded retry loop and, when
//! automation is exhausted, escalates to a human and waits for a decision.
//! Every process ends in one of four outcomes and keeps an append-only audit
//! log of what happened.
//!
//! ## Architecture
//!
//! Processes run on a small durable-execution runtime: every action result,
//! decision signal and state change is appended to a per-process history
//! before it takes effect. A process that stops part-way is resumed by
//! replaying that history; completed actions are served from the record and
//! never invoked twice.
//!
//! ## Module Organization
//!
//! - [`models`] - Case file, human task, decision and audit log types
//! - [`state_machine`] - Resolution states, events, guards, actions and process state
//! - [`orchestration`] - Workflow, issue strategies, retry controller and decision gate
//! - [`runtime`] - History store, logical clock, signal inbox, replay context and engine
//! - [`activities`] - Collaborator contracts and mock implementations
//! - [`config`] - Layered configuration
//! - [`events`] - Lifecycle event publishing
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use order_resolution::activities::{MockCaseFileBuilder, MockTransferRetrier};
//! use order_resolution::config::ResolutionConfig;
//! use order_resolution::runtime::ResolutionEngine;
//! use std::sync::Arc;
//!
//! # async fn example() -> order_resolution::Result<()> {
//! let engine = ResolutionEngine::new(
//!     ResolutionConfig::default(),
//!     Arc::new(MockCaseFileBuilder::new()),
//!     Arc::new(MockTransferRetrier::new()),
//! );
//!
//! let process = engine.start("ORDER-OK").await?;
//! let status = process.wait_for_outcome().await?;
//! println!("{status}: {} audit entries", process.audit_log().len());
//! # Ok(())
//! # }
//! ```

pub mod activities;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod runtime;
pub mod state_machine;

pub use config::{ConfigManager, ResolutionConfig};
pub use error::{ResolutionError, Result};
pub use models::{AuditEvent, AuditKind, AuditLog, CaseFile, HumanTask, IssueType, TaskDecision, TransferStatus};
pub use runtime::{ProcessHandle, ProcessStatus, ResolutionEngine};
pub use state_machine::{ResolutionOutcome, ResolutionState};
