pub mod audit;
pub mod case_file;
pub mod human_task;

// Re-export core models for easy access
pub use audit::{AuditEvent, AuditKind, AuditLog};
pub use case_file::{CaseFile, IssueType, TransferStatus};
pub use human_task::{HumanTask, TaskDecision};
