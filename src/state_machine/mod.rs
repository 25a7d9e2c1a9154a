// State machine module for order resolution
//
// The transition table and guards are pure; every applied event appends one
// audit entry, so a process state can be rebuilt from its recorded events.

pub mod actions;
pub mod errors;
pub mod events;
pub mod guards;
pub mod process_state;
pub mod resolution_state_machine;
pub mod states;

// Re-export main types for convenient access
pub use errors::{GuardError, StateMachineError, StateMachineResult};
pub use events::ResolutionEvent;
pub use process_state::ProcessState;
pub use resolution_state_machine::ResolutionStateMachine;
pub use states::{ResolutionOutcome, ResolutionState};

// Common traits and utilities
pub use actions::StateAction;
pub use guards::StateGuard;
