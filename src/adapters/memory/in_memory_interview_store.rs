//! In-Memory Interview Store
//!
//! Keeps sessions, turns and flagged snippets in memory. Implements both the
//! repository and the reader port. Useful for tests and for running the
//! console without a database.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, SessionId, TurnId};
use crate::domain::interview::{FlaggedSnippet, Session, Turn};
use crate::ports::{
    FollowUp, InterviewReader, InterviewRepository, SessionView, SnippetView, TurnCommit,
    TurnView,
};

/// Vectors keep insertion order, which is creation order.
#[derive(Debug, Default)]
struct State {
    sessions: Vec<Session>,
    turns: Vec<Turn>,
    snippets: Vec<FlaggedSnippet>,
    fail_next_start: Option<String>,
    fail_next_commit: Option<String>,
}

impl State {
    fn session_mut(&mut self, id: &SessionId) -> Result<&mut Session, DomainError> {
        self.sessions
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or_else(|| session_not_found(id))
    }

    /// Mirrors the one-open-turn index of the database schema. `answering`
    /// is the turn being closed by the same write, if any.
    fn ensure_no_open_turn(
        &self,
        session_id: &SessionId,
        answering: Option<&TurnId>,
    ) -> Result<(), DomainError> {
        let busy = self.turns.iter().any(|t| {
            t.session_id() == session_id && t.is_open() && Some(t.id()) != answering
        });
        if busy {
            return Err(DomainError::new(
                ErrorCode::TurnInProgress,
                format!("Session {} already has an open turn", session_id),
            ));
        }
        Ok(())
    }

    fn view_of(&self, session: &Session) -> SessionView {
        let turns = self
            .turns
            .iter()
            .filter(|t| t.session_id() == session.id())
            .map(|turn| TurnView {
                id: *turn.id(),
                question: turn.question().map(str::to_string),
                answer: turn.answer().map(str::to_string),
                aim: turn.aim().map(str::to_string),
                emotion: turn.emotion().map(str::to_string),
                progress: turn.progress_note().map(str::to_string),
                created_at: *turn.created_at(),
                updated_at: *turn.updated_at(),
                dubious: self
                    .snippets
                    .iter()
                    .filter(|s| s.turn_id() == turn.id())
                    .map(|s| SnippetView {
                        id: *s.id(),
                        snippet: s.text().to_string(),
                    })
                    .collect(),
            })
            .collect();

        SessionView {
            id: *session.id(),
            created_at: *session.created_at(),
            updated_at: *session.updated_at(),
            is_finished: session.is_finished(),
            draft: session.draft().map(str::to_string),
            turns,
        }
    }
}

fn session_not_found(id: &SessionId) -> DomainError {
    DomainError::new(
        ErrorCode::SessionNotFound,
        format!("Session {} does not exist", id),
    )
}

/// In-memory interview store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInterviewStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryInterviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snippets attached to a turn, in insertion order.
    pub async fn snippets_of(&self, turn_id: &TurnId) -> Vec<FlaggedSnippet> {
        self.state
            .read()
            .await
            .snippets
            .iter()
            .filter(|s| s.turn_id() == turn_id)
            .cloned()
            .collect()
    }

    /// Makes the next `start_session` fail with a database error without
    /// writing anything.
    pub async fn fail_next_start(&self, reason: impl Into<String>) {
        self.state.write().await.fail_next_start = Some(reason.into());
    }

    /// Makes the next `commit_turn` fail with a database error without
    /// writing anything.
    pub async fn fail_next_commit(&self, reason: impl Into<String>) {
        self.state.write().await.fail_next_commit = Some(reason.into());
    }
}

#[async_trait]
impl InterviewRepository for InMemoryInterviewStore {
    async fn start_session(&self, session: &Session, opening: &Turn) -> Result<(), DomainError> {
        if opening.session_id() != session.id() {
            return Err(DomainError::new(
                ErrorCode::TurnSessionMismatch,
                format!("Turn {} does not belong to session {}", opening.id(), session.id()),
            ));
        }

        let mut state = self.state.write().await;
        if state.sessions.iter().any(|s| s.id() == session.id()) {
            return Err(DomainError::database(
                "Failed to insert session",
                format!("session {} already exists", session.id()),
            ));
        }
        if let Some(reason) = state.fail_next_start.take() {
            return Err(DomainError::database("Failed to start session", reason));
        }

        state.sessions.push(session.clone());
        state.turns.push(opening.clone());
        Ok(())
    }

    async fn find_session(&self, id: &SessionId) -> Result<Option<Session>, DomainError> {
        let state = self.state.read().await;
        Ok(state.sessions.iter().find(|s| s.id() == id).cloned())
    }

    async fn find_turn(&self, id: &TurnId) -> Result<Option<Turn>, DomainError> {
        let state = self.state.read().await;
        Ok(state.turns.iter().find(|t| t.id() == id).cloned())
    }

    async fn list_turns(&self, session_id: &SessionId) -> Result<Vec<Turn>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .turns
            .iter()
            .filter(|t| t.session_id() == session_id)
            .cloned()
            .collect())
    }

    async fn commit_turn(&self, commit: &TurnCommit) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        let turn_id = *commit.answered.id();

        let index = state
            .turns
            .iter()
            .position(|t| t.id() == &turn_id)
            .ok_or_else(|| {
                DomainError::new(ErrorCode::TurnNotFound, format!("Turn {} does not exist", turn_id))
            })?;
        let stored = &state.turns[index];
        if stored.session_id() != &commit.session_id {
            return Err(DomainError::new(
                ErrorCode::TurnSessionMismatch,
                format!("Turn {} does not belong to session {}", turn_id, commit.session_id),
            ));
        }
        if !stored.is_open() {
            return Err(DomainError::new(
                ErrorCode::TurnAlreadyAnswered,
                format!("Turn {} has already been answered", turn_id),
            ));
        }
        state
            .session_mut(&commit.session_id)?
            .ensure_accepts_answers()?;
        if matches!(commit.follow_up, FollowUp::Continue(_)) {
            state.ensure_no_open_turn(&commit.session_id, Some(&turn_id))?;
        }

        if let Some(reason) = state.fail_next_commit.take() {
            return Err(DomainError::database("Failed to commit turn", reason));
        }

        // All checks passed; the writes below cannot fail.
        if let FollowUp::Finish { draft } = &commit.follow_up {
            state.session_mut(&commit.session_id)?.finish(draft.as_str())?;
        }
        state.turns[index] = commit.answered.clone();
        state.snippets.extend(commit.snippets.iter().cloned());
        if let FollowUp::Continue(next) = &commit.follow_up {
            state.turns.push(next.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl InterviewReader for InMemoryInterviewStore {
    async fn list_sessions(&self) -> Result<Vec<SessionView>, DomainError> {
        let state = self.state.read().await;
        Ok(state.sessions.iter().map(|s| state.view_of(s)).collect())
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<SessionView>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .sessions
            .iter()
            .find(|s| s.id() == id)
            .map(|s| state.view_of(s)))
    }
}
