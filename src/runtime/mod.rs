//! # Durable Execution Runtime
//!
//! The substrate order-resolution processes run on: an append-only history
//! per process, a logical clock, a durable signal inbox and a replaying
//! execution context. A process can stop at any point and be resumed from
//! its history without re-running completed actions.
//!
//! ## Core Components
//!
//! - **HistoryStore**: per-process event history and signal queue
//! - **ProcessContext**: replays recorded history, then records new events live
//! - **SignalInbox**: queued decisions plus an async wakeup for the gate
//! - **ResolutionEngine**: starts, recovers and addresses processes by id

pub mod clock;
pub mod context;
pub mod engine;
pub mod handle;
pub mod history;
pub mod inbox;
pub mod store;

pub use clock::{SteppingTimeSource, SystemTimeSource, TimeSource};
pub use context::{GateSignal, ProcessContext, RuntimeServices};
pub use engine::ResolutionEngine;
pub use handle::{ProcessHandle, ProcessStatus};
pub use history::HistoryEvent;
pub use inbox::SignalInbox;
pub use store::{HistoryStore, InMemoryHistoryStore};
