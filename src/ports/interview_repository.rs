//! Interview repository port (write side).
//!
//! Stores new sessions and applies the outcome of a processed turn as one
//! atomic unit.
//!
//! # Design
//!
//! - **Atomic start**: a session is stored together with its opening turn,
//!   so no session is ever persisted without a question to answer
//! - **Single commit path**: answering a turn, attaching its flagged
//!   snippets and either finishing the session or opening the next turn
//!   happen in one `commit_turn` call
//! - **Compare-and-swap**: the answer is only written while the stored turn
//!   is still open, so a lost race is reported instead of overwriting

use crate::domain::foundation::{DomainError, SessionId, TurnId};
use crate::domain::interview::{FlaggedSnippet, Session, Turn};
use async_trait::async_trait;

/// Repository port for sessions and turns.
#[async_trait]
pub trait InterviewRepository: Send + Sync {
    /// Saves a new session together with its opening turn. Either both are
    /// stored or neither is.
    ///
    /// # Errors
    ///
    /// - `TurnSessionMismatch` if `opening` belongs to another session
    /// - `DatabaseError` on persistence failure
    async fn start_session(&self, session: &Session, opening: &Turn) -> Result<(), DomainError>;

    /// Find a session by its ID. Returns `None` if not found.
    async fn find_session(&self, id: &SessionId) -> Result<Option<Session>, DomainError>;

    /// Find a turn by its ID. Returns `None` if not found.
    async fn find_turn(&self, id: &TurnId) -> Result<Option<Turn>, DomainError>;

    /// All turns of a session in creation order.
    async fn list_turns(&self, session_id: &SessionId) -> Result<Vec<Turn>, DomainError>;

    /// Applies a processed turn atomically. Either every write lands or none.
    ///
    /// # Errors
    ///
    /// - `TurnNotFound` if the answered turn doesn't exist
    /// - `TurnSessionMismatch` if it belongs to another session
    /// - `TurnAlreadyAnswered` if the stored turn is no longer open
    /// - `SessionNotFound` / `SessionFinished` if the session can't advance
    /// - `DatabaseError` on persistence failure
    async fn commit_turn(&self, commit: &TurnCommit) -> Result<(), DomainError>;
}

/// Everything written when a turn's answer is committed.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnCommit {
    pub session_id: SessionId,
    /// The open turn with its answer, emotion and progress note recorded.
    pub answered: Turn,
    /// Flagged snippets, all referencing `answered`.
    pub snippets: Vec<FlaggedSnippet>,
    pub follow_up: FollowUp,
}

/// What happens to the session after the answer is stored.
#[derive(Debug, Clone, PartialEq)]
pub enum FollowUp {
    /// Close the session with the final draft.
    Finish { draft: String },
    /// Open the next turn.
    Continue(Turn),
}
