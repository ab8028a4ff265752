//! PostgreSQL implementation of InterviewRepository.
//!
//! `start_session` writes the session row and its opening turn in one
//! transaction.
//!
//! `commit_turn` also runs in one transaction. The answer is written with a
//! compare-and-swap on `answer IS NULL`, so a turn answered by a concurrent
//! request is reported instead of being overwritten.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::debug;

use crate::domain::foundation::{DomainError, ErrorCode, SessionId, Timestamp, TurnId};
use crate::domain::interview::{Session, Turn};
use crate::ports::{FollowUp, InterviewRepository, TurnCommit};

/// PostgreSQL implementation of InterviewRepository.
#[derive(Clone)]
pub struct PostgresInterviewRepository {
    pool: PgPool,
}

impl PostgresInterviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InterviewRepository for PostgresInterviewRepository {
    async fn start_session(&self, session: &Session, opening: &Turn) -> Result<(), DomainError> {
        if opening.session_id() != session.id() {
            return Err(DomainError::new(
                ErrorCode::TurnSessionMismatch,
                format!("Turn {} does not belong to session {}", opening.id(), session.id()),
            ));
        }

        let mut tx = begin(&self.pool).await?;
        sqlx::query(
            r#"
            INSERT INTO sessions (id, is_finished, draft, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.is_finished())
        .bind(session.draft())
        .bind(session.created_at().as_datetime())
        .bind(session.updated_at().as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to insert session", e))?;

        insert_turn(&mut tx, opening).await?;
        commit(tx).await?;
        debug!(session_id = %session.id(), turn_id = %opening.id(), "session started");
        Ok(())
    }

    async fn find_session(&self, id: &SessionId) -> Result<Option<Session>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, is_finished, draft, created_at, updated_at
            FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch session", e))?;

        row.map(row_to_session).transpose()
    }

    async fn find_turn(&self, id: &TurnId) -> Result<Option<Turn>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, session_id, aim, question, answer, emotion, progress_note,
                   created_at, updated_at
            FROM turns
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch turn", e))?;

        row.map(row_to_turn).transpose()
    }

    async fn list_turns(&self, session_id: &SessionId) -> Result<Vec<Turn>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_id, aim, question, answer, emotion, progress_note,
                   created_at, updated_at
            FROM turns
            WHERE session_id = $1
            ORDER BY created_at, seq
            "#,
        )
        .bind(session_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch turns", e))?;

        rows.into_iter().map(row_to_turn).collect()
    }

    async fn commit_turn(&self, commit_req: &TurnCommit) -> Result<(), DomainError> {
        let answered = &commit_req.answered;
        let mut tx = begin(&self.pool).await?;

        lock_open_session(&mut tx, &commit_req.session_id).await?;

        let result = sqlx::query(
            r#"
            UPDATE turns SET
                answer = $3,
                emotion = $4,
                progress_note = $5,
                updated_at = $6
            WHERE id = $1 AND session_id = $2 AND answer IS NULL
            "#,
        )
        .bind(answered.id().as_uuid())
        .bind(commit_req.session_id.as_uuid())
        .bind(answered.answer())
        .bind(answered.emotion())
        .bind(answered.progress_note())
        .bind(answered.updated_at().as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to record answer", e))?;

        if result.rows_affected() == 0 {
            return Err(explain_lost_swap(&mut tx, answered.id(), &commit_req.session_id).await);
        }

        for snippet in &commit_req.snippets {
            sqlx::query(
                r#"
                INSERT INTO flagged_snippets (id, turn_id, snippet)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(snippet.id().as_uuid())
            .bind(snippet.turn_id().as_uuid())
            .bind(snippet.text())
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::database("Failed to insert flagged snippet", e))?;
        }

        let now = Timestamp::now();
        match &commit_req.follow_up {
            FollowUp::Finish { draft } => {
                sqlx::query(
                    r#"
                    UPDATE sessions SET is_finished = TRUE, draft = $2, updated_at = $3
                    WHERE id = $1
                    "#,
                )
                .bind(commit_req.session_id.as_uuid())
                .bind(draft)
                .bind(now.as_datetime())
                .execute(&mut *tx)
                .await
                .map_err(|e| DomainError::database("Failed to finish session", e))?;
            }
            FollowUp::Continue(next) => {
                insert_turn(&mut tx, next).await?;
                sqlx::query("UPDATE sessions SET updated_at = $2 WHERE id = $1")
                    .bind(commit_req.session_id.as_uuid())
                    .bind(now.as_datetime())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| DomainError::database("Failed to touch session", e))?;
            }
        }

        commit(tx).await?;
        debug!(
            session_id = %commit_req.session_id,
            turn_id = %answered.id(),
            snippets = commit_req.snippets.len(),
            "turn committed"
        );
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Helper functions
// ════════════════════════════════════════════════════════════════════════════

async fn begin(pool: &PgPool) -> Result<Transaction<'static, Postgres>, DomainError> {
    pool.begin()
        .await
        .map_err(|e| DomainError::database("Failed to start transaction", e))
}

async fn commit(tx: Transaction<'static, Postgres>) -> Result<(), DomainError> {
    tx.commit()
        .await
        .map_err(|e| DomainError::database("Failed to commit transaction", e))
}

/// Locks the session row and checks it still accepts answers.
async fn lock_open_session(
    tx: &mut Transaction<'static, Postgres>,
    session_id: &SessionId,
) -> Result<(), DomainError> {
    let row = sqlx::query("SELECT is_finished FROM sessions WHERE id = $1 FOR UPDATE")
        .bind(session_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| DomainError::database("Failed to lock session", e))?;

    let is_finished: bool = match row {
        Some(row) => row
            .try_get("is_finished")
            .map_err(|e| DomainError::database("Failed to get is_finished", e))?,
        None => {
            return Err(DomainError::new(
                ErrorCode::SessionNotFound,
                format!("Session {} does not exist", session_id),
            ))
        }
    };

    if is_finished {
        return Err(DomainError::new(
            ErrorCode::SessionFinished,
            format!("Session {} is already finished", session_id),
        ));
    }
    Ok(())
}

async fn insert_turn(
    tx: &mut Transaction<'static, Postgres>,
    turn: &Turn,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        INSERT INTO turns (
            id, session_id, aim, question, answer, emotion, progress_note,
            created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(turn.id().as_uuid())
    .bind(turn.session_id().as_uuid())
    .bind(turn.aim())
    .bind(turn.question())
    .bind(turn.answer())
    .bind(turn.emotion())
    .bind(turn.progress_note())
    .bind(turn.created_at().as_datetime())
    .bind(turn.updated_at().as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(|e| match e {
        // idx_turns_one_open: the session already has an open turn.
        sqlx::Error::Database(db) if db.is_unique_violation() => DomainError::new(
            ErrorCode::TurnInProgress,
            format!("Session {} already has an open turn", turn.session_id()),
        ),
        other => DomainError::database("Failed to insert turn", other),
    })?;
    Ok(())
}

/// Works out why the compare-and-swap on the open turn matched nothing.
async fn explain_lost_swap(
    tx: &mut Transaction<'static, Postgres>,
    turn_id: &TurnId,
    session_id: &SessionId,
) -> DomainError {
    let row = sqlx::query("SELECT session_id FROM turns WHERE id = $1")
        .bind(turn_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await;

    match row {
        Err(e) => DomainError::database("Failed to fetch turn", e),
        Ok(None) => DomainError::new(
            ErrorCode::TurnNotFound,
            format!("Turn {} does not exist", turn_id),
        ),
        Ok(Some(row)) => match row.try_get::<uuid::Uuid, _>("session_id") {
            Ok(owner) if owner != *session_id.as_uuid() => DomainError::new(
                ErrorCode::TurnSessionMismatch,
                format!("Turn {} does not belong to session {}", turn_id, session_id),
            ),
            Ok(_) => DomainError::new(
                ErrorCode::TurnAlreadyAnswered,
                format!("Turn {} has already been answered", turn_id),
            ),
            Err(e) => DomainError::database("Failed to get session_id", e),
        },
    }
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| DomainError::database(&format!("Failed to get {}", name), e))
}

pub(super) fn row_to_session(row: PgRow) -> Result<Session, DomainError> {
    Ok(Session::reconstitute(
        SessionId::from_uuid(column(&row, "id")?),
        column(&row, "is_finished")?,
        column(&row, "draft")?,
        Timestamp::from_datetime(column(&row, "created_at")?),
        Timestamp::from_datetime(column(&row, "updated_at")?),
    ))
}

pub(super) fn row_to_turn(row: PgRow) -> Result<Turn, DomainError> {
    Ok(Turn::reconstitute(
        TurnId::from_uuid(column(&row, "id")?),
        SessionId::from_uuid(column(&row, "session_id")?),
        column(&row, "aim")?,
        column(&row, "question")?,
        column(&row, "answer")?,
        column(&row, "emotion")?,
        column(&row, "progress_note")?,
        Timestamp::from_datetime(column(&row, "created_at")?),
        Timestamp::from_datetime(column(&row, "updated_at")?),
    ))
}
