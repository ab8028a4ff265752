//! Turn entity - one question/answer exchange within a session.

use crate::domain::foundation::{DomainError, ErrorCode, SessionId, Timestamp, TurnId};
use serde::{Deserialize, Serialize};

/// Storage bound for the interview aim of a turn.
pub const MAX_AIM_LENGTH: usize = 255;

/// Storage bound for an emotion label.
pub const MAX_EMOTION_LENGTH: usize = 50;

/// One question/answer exchange.
///
/// # Invariants
///
/// - A turn is *open* while `answer` is `None`
/// - `answer`, `emotion` and `progress_note` are written once, together
/// - `aim` never exceeds [`MAX_AIM_LENGTH`] characters, `emotion` never
///   exceeds [`MAX_EMOTION_LENGTH`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    id: TurnId,
    session_id: SessionId,
    aim: Option<String>,
    question: Option<String>,
    answer: Option<String>,
    emotion: Option<String>,
    progress_note: Option<String>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Turn {
    /// Opens a new turn awaiting the user's answer.
    pub fn open(
        session_id: SessionId,
        aim: impl Into<String>,
        question: impl Into<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: TurnId::new(),
            session_id,
            aim: Some(clip(aim.into(), MAX_AIM_LENGTH)),
            question: Some(question.into()),
            answer: None,
            emotion: None,
            progress_note: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstitute a turn from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: TurnId,
        session_id: SessionId,
        aim: Option<String>,
        question: Option<String>,
        answer: Option<String>,
        emotion: Option<String>,
        progress_note: Option<String>,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            session_id,
            aim,
            question,
            answer,
            emotion,
            progress_note,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &TurnId {
        &self.id
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn aim(&self) -> Option<&str> {
        self.aim.as_deref()
    }

    pub fn question(&self) -> Option<&str> {
        self.question.as_deref()
    }

    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    pub fn emotion(&self) -> Option<&str> {
        self.emotion.as_deref()
    }

    pub fn progress_note(&self) -> Option<&str> {
        self.progress_note.as_deref()
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    /// Returns true while the turn awaits an answer.
    pub fn is_open(&self) -> bool {
        self.answer.is_none()
    }

    /// Records the user's answer together with its analysis.
    ///
    /// # Errors
    ///
    /// - `TurnAlreadyAnswered` if the turn is closed
    pub fn record_answer(
        &mut self,
        answer: impl Into<String>,
        emotion: Option<String>,
        progress_note: Option<String>,
    ) -> Result<(), DomainError> {
        if !self.is_open() {
            return Err(DomainError::new(
                ErrorCode::TurnAlreadyAnswered,
                format!("Turn {} has already been answered", self.id),
            )
            .with_detail("turn_id", self.id.to_string()));
        }

        self.answer = Some(answer.into());
        self.emotion = emotion.map(|label| clip(label, MAX_EMOTION_LENGTH));
        self.progress_note = progress_note;
        self.updated_at = Timestamp::now();
        Ok(())
    }
}

/// Truncates to at most `max` characters on a char boundary.
fn clip(mut value: String, max: usize) -> String {
    if let Some((idx, _)) = value.char_indices().nth(max) {
        value.truncate(idx);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opened_turn_awaits_answer() {
        let turn = Turn::open(SessionId::new(), "Background", "Who are you?");
        assert!(turn.is_open());
        assert_eq!(turn.aim(), Some("Background"));
        assert_eq!(turn.question(), Some("Who are you?"));
        assert!(turn.emotion().is_none());
    }

    #[test]
    fn record_answer_closes_turn() {
        let mut turn = Turn::open(SessionId::new(), "aim", "q");
        turn.record_answer("a", Some("positive".into()), Some("10%".into()))
            .unwrap();

        assert!(!turn.is_open());
        assert_eq!(turn.answer(), Some("a"));
        assert_eq!(turn.emotion(), Some("positive"));
        assert_eq!(turn.progress_note(), Some("10%"));
    }

    #[test]
    fn answered_turn_rejects_second_answer() {
        let mut turn = Turn::open(SessionId::new(), "aim", "q");
        turn.record_answer("first", None, None).unwrap();

        let err = turn.record_answer("second", None, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::TurnAlreadyAnswered);
        assert_eq!(turn.answer(), Some("first"));
    }

    #[test]
    fn long_aim_is_clipped_on_char_boundary() {
        let aim = "回".repeat(MAX_AIM_LENGTH + 10);
        let turn = Turn::open(SessionId::new(), aim, "q");
        assert_eq!(turn.aim().unwrap().chars().count(), MAX_AIM_LENGTH);
    }

    #[test]
    fn long_emotion_label_is_clipped() {
        let mut turn = Turn::open(SessionId::new(), "aim", "q");
        turn.record_answer("a", Some("x".repeat(80)), None).unwrap();
        assert_eq!(turn.emotion().unwrap().len(), MAX_EMOTION_LENGTH);
    }
}
