//! Session aggregate entity.
//!
//! A session is one complete interview. It owns its turns (by id, through the
//! store) and carries the final draft once the interview is closed.

use crate::domain::foundation::{DomainError, ErrorCode, SessionId, Timestamp};
use serde::{Deserialize, Serialize};

/// Session aggregate - one interview conversation.
///
/// # Invariants
///
/// - `draft` is only set when `is_finished` is true
/// - A finished session never reopens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    is_finished: bool,
    draft: Option<String>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Session {
    /// Starts a new, unfinished session.
    pub fn start() -> Self {
        let now = Timestamp::now();
        Self {
            id: SessionId::new(),
            is_finished: false,
            draft: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstitute a session from persistence (no validation).
    pub fn reconstitute(
        id: SessionId,
        is_finished: bool,
        draft: Option<String>,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            is_finished,
            draft,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    pub fn draft(&self) -> Option<&str> {
        self.draft.as_deref()
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    /// Fails with `SessionFinished` if the interview is already closed.
    pub fn ensure_accepts_answers(&self) -> Result<(), DomainError> {
        if self.is_finished {
            return Err(DomainError::new(
                ErrorCode::SessionFinished,
                format!("Session {} is already finished", self.id),
            ));
        }
        Ok(())
    }

    /// Closes the interview and stores the final draft.
    ///
    /// # Errors
    ///
    /// - `SessionFinished` if the session was already closed
    pub fn finish(&mut self, draft: impl Into<String>) -> Result<(), DomainError> {
        self.ensure_accepts_answers()?;
        self.is_finished = true;
        self.draft = Some(draft.into());
        self.updated_at = Timestamp::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_open_without_draft() {
        let session = Session::start();
        assert!(!session.is_finished());
        assert!(session.draft().is_none());
        assert!(session.ensure_accepts_answers().is_ok());
    }

    #[test]
    fn finish_stores_draft_and_closes() {
        let mut session = Session::start();
        session.finish("Once upon a time").unwrap();

        assert!(session.is_finished());
        assert_eq!(session.draft(), Some("Once upon a time"));
        assert!(!session.updated_at().is_before(session.created_at()));
    }

    #[test]
    fn finished_session_rejects_second_finish() {
        let mut session = Session::start();
        session.finish("first").unwrap();

        let err = session.finish("second").unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionFinished);
        assert_eq!(session.draft(), Some("first"));
    }

    #[test]
    fn finished_session_rejects_answers() {
        let mut session = Session::start();
        session.finish("done").unwrap();
        assert_eq!(
            session.ensure_accepts_answers().unwrap_err().code,
            ErrorCode::SessionFinished
        );
    }
}
