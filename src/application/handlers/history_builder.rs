//! Session history builder.
//!
//! Reconstructs the linear interview transcript from persisted turns. Used
//! to feed the orchestrator and to resume a session after a restart.

use std::sync::Arc;

use tracing::debug;

use crate::domain::foundation::{DomainError, SessionId};
use crate::domain::interview::{render_transcript, InterviewContext};
use crate::ports::InterviewRepository;

/// Read-only builder of interview contexts.
#[derive(Clone)]
pub struct SessionHistoryBuilder {
    repository: Arc<dyn InterviewRepository>,
}

impl SessionHistoryBuilder {
    pub fn new(repository: Arc<dyn InterviewRepository>) -> Self {
        Self { repository }
    }

    /// Renders the session's turns and returns the open turn's id.
    ///
    /// A session with no turns, or one that does not exist, yields
    /// [`InterviewContext::empty`]; callers must refuse to continue then.
    pub async fn build_context(
        &self,
        session_id: &SessionId,
    ) -> Result<InterviewContext, DomainError> {
        let turns = self.repository.list_turns(session_id).await?;
        let context = InterviewContext::from_turns(&turns);
        debug!(
            session_id = %session_id,
            turns = turns.len(),
            open_turn_id = ?context.open_turn_id(),
            "built interview context"
        );
        Ok(context)
    }

    /// Human-readable transcript of every turn, for the console.
    pub async fn transcript(&self, session_id: &SessionId) -> Result<String, DomainError> {
        let turns = self.repository.list_turns(session_id).await?;
        Ok(render_transcript(&turns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryInterviewStore;
    use crate::domain::interview::{Session, Turn};
    use crate::ports::{FollowUp, TurnCommit};

    async fn started(opening: (&str, &str)) -> (Arc<InMemoryInterviewStore>, Turn) {
        let store = Arc::new(InMemoryInterviewStore::new());
        let session = Session::start();
        let turn = Turn::open(*session.id(), opening.0, opening.1);
        store.start_session(&session, &turn).await.unwrap();
        (store, turn)
    }

    #[tokio::test]
    async fn unknown_session_yields_empty_context() {
        let store = Arc::new(InMemoryInterviewStore::new());
        let builder = SessionHistoryBuilder::new(store);

        let ctx = builder.build_context(&SessionId::new()).await.unwrap();
        assert!(ctx.is_empty());
        assert_eq!(ctx.text(), "");
    }

    #[tokio::test]
    async fn fresh_session_ends_with_opening_question() {
        let (store, opening) = started(("Background", "Name?")).await;
        let builder = SessionHistoryBuilder::new(store);

        let ctx = builder.build_context(opening.session_id()).await.unwrap();
        assert_eq!(ctx.text(), "aim: Background\nquestion: Name?\nanswer: ");
        assert_eq!(ctx.open_turn_id(), Some(*opening.id()));
    }

    #[tokio::test]
    async fn two_turn_history_ends_with_open_turn() {
        let (store, first) = started(("aimA", "qA")).await;
        let session_id = *first.session_id();

        let mut answered = first.clone();
        answered
            .record_answer("a1", Some("positive".into()), Some("30%".into()))
            .unwrap();
        let second = Turn::open(session_id, "aimB", "qB");
        store
            .commit_turn(&TurnCommit {
                session_id,
                answered,
                snippets: vec![],
                follow_up: FollowUp::Continue(second.clone()),
            })
            .await
            .unwrap();

        let builder = SessionHistoryBuilder::new(store);
        let ctx = builder.build_context(&session_id).await.unwrap();

        assert!(ctx.text().starts_with("aim: aimA\nquestion: qA\nanswer: a1\n"));
        assert!(ctx.text().ends_with("aim: aimB\nquestion: qB\nanswer: "));
        assert_eq!(ctx.open_turn_id(), Some(*second.id()));

        let again = builder.build_context(&session_id).await.unwrap();
        assert_eq!(ctx, again);
    }

    #[tokio::test]
    async fn transcript_lists_turns() {
        let (store, opening) = started(("Background", "Name?")).await;
        let session_id = *opening.session_id();
        let builder = SessionHistoryBuilder::new(store);

        let transcript = builder.transcript(&session_id).await.unwrap();
        assert!(transcript.contains("Q: Name?"));
    }
}
