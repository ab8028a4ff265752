//! Interview reader port (read side).
//!
//! Denormalized views of sessions with their turns and flagged snippets,
//! shaped for the listing endpoint and the console.

use crate::domain::foundation::{DomainError, SessionId, SnippetId, Timestamp, TurnId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Reader port for interview queries.
#[async_trait]
pub trait InterviewReader: Send + Sync {
    /// All sessions, oldest first, each with its turns in creation order.
    async fn list_sessions(&self) -> Result<Vec<SessionView>, DomainError>;

    /// One session with its turns. Returns `None` if not found.
    async fn get_session(&self, id: &SessionId) -> Result<Option<SessionView>, DomainError>;
}

/// Session with nested turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub id: SessionId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub is_finished: bool,
    pub draft: Option<String>,
    #[serde(rename = "qas")]
    pub turns: Vec<TurnView>,
}

/// Turn with its flagged snippets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnView {
    pub id: TurnId,
    pub question: Option<String>,
    pub answer: Option<String>,
    pub aim: Option<String>,
    pub emotion: Option<String>,
    pub progress: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub dubious: Vec<SnippetView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetView {
    pub id: SnippetId,
    pub snippet: String,
}

impl SessionView {
    /// The turn still awaiting an answer, if any.
    pub fn open_turn(&self) -> Option<&TurnView> {
        self.turns.iter().find(|t| t.answer.is_none())
    }
}
