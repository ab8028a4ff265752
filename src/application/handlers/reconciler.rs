//! Persistence reconciler.
//!
//! Turns the orchestrator's final snapshot into stored state: the answer is
//! written onto the open turn together with its flagged snippets, and the
//! session is either closed with its draft or advanced to a new open turn.

use std::sync::Arc;

use tracing::info;

use crate::domain::foundation::{require_non_blank, ErrorCode, SessionId, TurnId, ValidationError};
use crate::domain::interview::{FlaggedSnippet, Turn, TurnError};
use crate::domain::pipeline::TurnSnapshot;
use crate::ports::{FollowUp, InterviewRepository, TurnCommit};

/// Result of a successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The session is finished; no turn is open any more.
    Closed,
    /// A new open turn was created.
    Advanced { next_turn_id: TurnId },
}

/// Command to commit one processed turn.
#[derive(Debug, Clone)]
pub struct CommitTurnCommand {
    pub session_id: SessionId,
    pub open_turn_id: TurnId,
    pub answer: String,
    pub snapshot: TurnSnapshot,
}

/// The only writer of answers, emotions, progress notes and drafts.
#[derive(Clone)]
pub struct PersistenceReconciler {
    repository: Arc<dyn InterviewRepository>,
}

impl PersistenceReconciler {
    pub fn new(repository: Arc<dyn InterviewRepository>) -> Self {
        Self { repository }
    }

    /// Applies the snapshot atomically.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank answer or an incomplete snapshot
    /// - `Consistency` if `open_turn_id` is not an unanswered turn of an
    ///   unfinished `session_id`; nothing is auto-corrected
    /// - `Persistence` if the store fails, with the snapshot retained
    pub async fn commit_turn(&self, cmd: &CommitTurnCommand) -> Result<CommitOutcome, TurnError> {
        require_non_blank("input", &cmd.answer)?;
        let store_err = |e| TurnError::from_store(e, &cmd.snapshot);

        let session = self
            .repository
            .find_session(&cmd.session_id)
            .await
            .map_err(store_err)?
            .ok_or_else(|| {
                TurnError::consistency(
                    ErrorCode::SessionNotFound,
                    format!("Session {} does not exist", cmd.session_id),
                )
            })?;
        session
            .ensure_accepts_answers()
            .map_err(TurnError::Consistency)?;

        let mut turn = self
            .repository
            .find_turn(&cmd.open_turn_id)
            .await
            .map_err(store_err)?
            .ok_or_else(|| {
                TurnError::consistency(
                    ErrorCode::TurnNotFound,
                    format!("Turn {} does not exist", cmd.open_turn_id),
                )
            })?;
        if turn.session_id() != &cmd.session_id {
            return Err(TurnError::consistency(
                ErrorCode::TurnSessionMismatch,
                format!(
                    "Turn {} does not belong to session {}",
                    cmd.open_turn_id, cmd.session_id
                ),
            ));
        }

        let snapshot = &cmd.snapshot;
        turn.record_answer(
            cmd.answer.as_str(),
            snapshot.emotion().map(str::to_string),
            snapshot.process_note().map(str::to_string),
        )
        .map_err(TurnError::Consistency)?;

        let follow_up = follow_up_for(&cmd.session_id, snapshot)?;
        let outcome = match &follow_up {
            FollowUp::Finish { .. } => CommitOutcome::Closed,
            FollowUp::Continue(next) => CommitOutcome::Advanced {
                next_turn_id: *next.id(),
            },
        };

        let commit = TurnCommit {
            session_id: cmd.session_id,
            snippets: FlaggedSnippet::batch_for(*turn.id(), snapshot.dubious_snippets()),
            answered: turn,
            follow_up,
        };
        self.repository
            .commit_turn(&commit)
            .await
            .map_err(store_err)?;

        info!(
            session_id = %cmd.session_id,
            turn_id = %cmd.open_turn_id,
            snippets = commit.snippets.len(),
            outcome = ?outcome,
            "committed turn"
        );
        Ok(outcome)
    }
}

fn follow_up_for(session_id: &SessionId, snapshot: &TurnSnapshot) -> Result<FollowUp, TurnError> {
    if snapshot.is_finished() {
        let draft = snapshot
            .draft()
            .ok_or_else(|| ValidationError::empty_field("draft"))?;
        return Ok(FollowUp::Finish {
            draft: draft.to_string(),
        });
    }

    let aim = snapshot
        .aim()
        .ok_or_else(|| ValidationError::empty_field("aim"))?;
    let question = snapshot
        .question()
        .ok_or_else(|| ValidationError::empty_field("question"))?;
    Ok(FollowUp::Continue(Turn::open(*session_id, aim, question)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryInterviewStore;
    use crate::domain::interview::Session;

    struct Fixture {
        store: Arc<InMemoryInterviewStore>,
        reconciler: PersistenceReconciler,
        session_id: SessionId,
        open_turn_id: TurnId,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryInterviewStore::new());
        let session = Session::start();
        let turn = Turn::open(*session.id(), "Background", "Who are you?");
        store.start_session(&session, &turn).await.unwrap();

        Fixture {
            reconciler: PersistenceReconciler::new(store.clone()),
            store,
            session_id: *session.id(),
            open_turn_id: *turn.id(),
        }
    }

    fn continuing_snapshot() -> TurnSnapshot {
        let mut s = TurnSnapshot::new();
        s.record_emotion("positive");
        s.record_dubious(vec!["a".into(), "b".into()]);
        s.record_process("30%");
        s.record_aim("Childhood");
        s.record_question("Where did you grow up?");
        s
    }

    fn finishing_snapshot() -> TurnSnapshot {
        let mut s = TurnSnapshot::new();
        s.record_emotion("neutral");
        s.record_process("100%");
        s.record_finished(true);
        s.record_draft("The end.");
        s
    }

    fn command(f: &Fixture, snapshot: TurnSnapshot) -> CommitTurnCommand {
        CommitTurnCommand {
            session_id: f.session_id,
            open_turn_id: f.open_turn_id,
            answer: "I am Ada".into(),
            snapshot,
        }
    }

    fn open_turns(turns: &[Turn]) -> usize {
        turns.iter().filter(|t| t.is_open()).count()
    }

    #[tokio::test]
    async fn continue_opens_exactly_one_new_turn() {
        let f = fixture().await;
        let outcome = f
            .reconciler
            .commit_turn(&command(&f, continuing_snapshot()))
            .await
            .unwrap();

        let CommitOutcome::Advanced { next_turn_id } = outcome else {
            panic!("expected Advanced, got {outcome:?}");
        };
        let turns = f.store.list_turns(&f.session_id).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(open_turns(&turns), 1);
        assert_eq!(turns[1].id(), &next_turn_id);
        assert_eq!(turns[1].aim(), Some("Childhood"));

        let answered = &turns[0];
        assert_eq!(answered.answer(), Some("I am Ada"));
        assert_eq!(answered.emotion(), Some("positive"));
        assert_eq!(answered.progress_note(), Some("30%"));

        let snippets = f.store.snippets_of(answered.id()).await;
        assert_eq!(snippets.len(), 2);
    }

    #[tokio::test]
    async fn finish_closes_session_without_new_turn() {
        let f = fixture().await;
        let outcome = f
            .reconciler
            .commit_turn(&command(&f, finishing_snapshot()))
            .await
            .unwrap();
        assert_eq!(outcome, CommitOutcome::Closed);

        let session = f.store.find_session(&f.session_id).await.unwrap().unwrap();
        assert!(session.is_finished());
        assert_eq!(session.draft(), Some("The end."));

        let turns = f.store.list_turns(&f.session_id).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(open_turns(&turns), 0);
    }

    #[tokio::test]
    async fn second_commit_on_same_turn_is_consistency_error() {
        let f = fixture().await;
        f.reconciler
            .commit_turn(&command(&f, continuing_snapshot()))
            .await
            .unwrap();

        let err = f
            .reconciler
            .commit_turn(&command(&f, continuing_snapshot()))
            .await
            .unwrap_err();
        let TurnError::Consistency(inner) = err else {
            panic!("expected consistency error, got {err:?}");
        };
        assert_eq!(inner.code, ErrorCode::TurnAlreadyAnswered);
    }

    #[tokio::test]
    async fn unknown_turn_is_consistency_error() {
        let f = fixture().await;
        let mut cmd = command(&f, continuing_snapshot());
        cmd.open_turn_id = TurnId::new();

        let err = f.reconciler.commit_turn(&cmd).await.unwrap_err();
        assert!(matches!(err, TurnError::Consistency(ref e) if e.code == ErrorCode::TurnNotFound));
    }

    #[tokio::test]
    async fn turn_from_other_session_is_rejected() {
        let f = fixture().await;
        let other = Session::start();
        f.store
            .start_session(&other, &Turn::open(*other.id(), "Background", "Who?"))
            .await
            .unwrap();
        let mut cmd = command(&f, continuing_snapshot());
        cmd.session_id = *other.id();

        let err = f.reconciler.commit_turn(&cmd).await.unwrap_err();
        assert!(
            matches!(err, TurnError::Consistency(ref e) if e.code == ErrorCode::TurnSessionMismatch)
        );
        let turns = f.store.list_turns(&f.session_id).await.unwrap();
        assert!(turns[0].is_open());
    }

    #[tokio::test]
    async fn finished_session_refuses_commit() {
        let f = fixture().await;
        f.reconciler
            .commit_turn(&command(&f, finishing_snapshot()))
            .await
            .unwrap();

        let err = f
            .reconciler
            .commit_turn(&command(&f, continuing_snapshot()))
            .await
            .unwrap_err();
        assert!(matches!(err, TurnError::Consistency(ref e) if e.code == ErrorCode::SessionFinished));
    }

    #[tokio::test]
    async fn finished_snapshot_without_draft_is_rejected() {
        let f = fixture().await;
        let mut snapshot = TurnSnapshot::new();
        snapshot.record_finished(true);

        let err = f
            .reconciler
            .commit_turn(&command(&f, snapshot))
            .await
            .unwrap_err();
        assert!(matches!(err, TurnError::Validation(_)));
        let turns = f.store.list_turns(&f.session_id).await.unwrap();
        assert!(turns[0].is_open());
    }

    #[tokio::test]
    async fn store_failure_retains_snapshot() {
        let f = fixture().await;
        f.store.fail_next_commit("disk full").await;
        let snapshot = continuing_snapshot();

        let err = f
            .reconciler
            .commit_turn(&command(&f, snapshot.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.retained_snapshot(), Some(&snapshot));

        let turns = f.store.list_turns(&f.session_id).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert!(turns[0].is_open());
    }
}
