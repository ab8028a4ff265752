//! PostgreSQL implementation of InterviewReader.
//!
//! Loads sessions, turns and snippets with one query each and nests them in
//! memory, keeping creation order at every level.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use uuid::Uuid;

use super::interview_repository::{row_to_session, row_to_turn};
use crate::domain::foundation::{DomainError, SessionId, SnippetId};
use crate::domain::interview::{Session, Turn};
use crate::ports::{InterviewReader, SessionView, SnippetView, TurnView};

/// PostgreSQL implementation of InterviewReader.
#[derive(Clone)]
pub struct PostgresInterviewReader {
    pool: PgPool,
}

impl PostgresInterviewReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads sessions matching `filter` (all sessions when `None`).
    async fn load(&self, filter: Option<&SessionId>) -> Result<Vec<SessionView>, DomainError> {
        let filter = filter.map(|id| *id.as_uuid());

        let sessions: Vec<Session> = sqlx::query(
            r#"
            SELECT id, is_finished, draft, created_at, updated_at
            FROM sessions
            WHERE $1::uuid IS NULL OR id = $1
            ORDER BY created_at, seq
            "#,
        )
        .bind(filter)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch sessions", e))?
        .into_iter()
        .map(row_to_session)
        .collect::<Result<_, _>>()?;

        if sessions.is_empty() {
            return Ok(Vec::new());
        }

        let turns: Vec<Turn> = sqlx::query(
            r#"
            SELECT id, session_id, aim, question, answer, emotion, progress_note,
                   created_at, updated_at
            FROM turns
            WHERE $1::uuid IS NULL OR session_id = $1
            ORDER BY created_at, seq
            "#,
        )
        .bind(filter)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch turns", e))?
        .into_iter()
        .map(row_to_turn)
        .collect::<Result<_, _>>()?;

        let snippet_rows = sqlx::query(
            r#"
            SELECT f.id, f.turn_id, f.snippet
            FROM flagged_snippets f
            JOIN turns t ON t.id = f.turn_id
            WHERE $1::uuid IS NULL OR t.session_id = $1
            ORDER BY f.seq
            "#,
        )
        .bind(filter)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch flagged snippets", e))?;

        let mut snippets: HashMap<Uuid, Vec<SnippetView>> = HashMap::new();
        for row in snippet_rows {
            let id: Uuid = row
                .try_get("id")
                .map_err(|e| DomainError::database("Failed to get id", e))?;
            let turn_id: Uuid = row
                .try_get("turn_id")
                .map_err(|e| DomainError::database("Failed to get turn_id", e))?;
            let snippet: String = row
                .try_get("snippet")
                .map_err(|e| DomainError::database("Failed to get snippet", e))?;
            snippets.entry(turn_id).or_default().push(SnippetView {
                id: SnippetId::from_uuid(id),
                snippet,
            });
        }

        let mut turns_by_session: HashMap<Uuid, Vec<TurnView>> = HashMap::new();
        for turn in turns {
            let dubious = snippets.remove(turn.id().as_uuid()).unwrap_or_default();
            turns_by_session
                .entry(*turn.session_id().as_uuid())
                .or_default()
                .push(turn_view(&turn, dubious));
        }

        Ok(sessions
            .into_iter()
            .map(|session| SessionView {
                id: *session.id(),
                created_at: *session.created_at(),
                updated_at: *session.updated_at(),
                is_finished: session.is_finished(),
                draft: session.draft().map(str::to_string),
                turns: turns_by_session
                    .remove(session.id().as_uuid())
                    .unwrap_or_default(),
            })
            .collect())
    }
}

fn turn_view(turn: &Turn, dubious: Vec<SnippetView>) -> TurnView {
    TurnView {
        id: *turn.id(),
        question: turn.question().map(str::to_string),
        answer: turn.answer().map(str::to_string),
        aim: turn.aim().map(str::to_string),
        emotion: turn.emotion().map(str::to_string),
        progress: turn.progress_note().map(str::to_string),
        created_at: *turn.created_at(),
        updated_at: *turn.updated_at(),
        dubious,
    }
}

#[async_trait]
impl InterviewReader for PostgresInterviewReader {
    async fn list_sessions(&self) -> Result<Vec<SessionView>, DomainError> {
        self.load(None).await
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<SessionView>, DomainError> {
        Ok(self.load(Some(id)).await?.into_iter().next())
    }
}
