//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, error types and the state machine trait
//! that form the vocabulary of the interview domain.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{require_non_blank, DomainError, ErrorCode, ValidationError};
pub use ids::{SessionId, SnippetId, TurnId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
