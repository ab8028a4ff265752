//! Interview service.
//!
//! Entry point used by the HTTP handlers and the console. Composes the
//! history builder, the turn orchestrator and the reconciler:
//!
//! ```text
//! start(answer)              continue(session, answer)
//!   create session             claim session lock
//!   open first turn    --->    build context, append answer
//!                              relay orchestrator events
//!                              on final: commit, then relay final
//! ```
//!
//! Input validation failures are returned before any stream exists. Every
//! other failure is delivered as the single terminal `error` event.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::domain::foundation::{require_non_blank, DomainError, ErrorCode, SessionId};
use crate::domain::interview::{Session, Turn, TurnError};
use crate::domain::pipeline::{EventKind, ProgressEvent, TurnSnapshot};
use crate::ports::{InterviewReader, InterviewRepository, SessionView};

use super::history_builder::SessionHistoryBuilder;
use super::reconciler::{CommitTurnCommand, PersistenceReconciler};
use super::session_locks::SessionLocks;
use super::turn_orchestrator::TurnOrchestrator;

/// Interview-level settings.
#[derive(Debug, Clone)]
pub struct InterviewSettings {
    /// Aim of the first turn of every session.
    pub opening_aim: String,
    /// Question of the first turn of every session.
    pub opening_question: String,
    /// Capacity of the outgoing event channel.
    pub event_buffer: usize,
}

impl Default for InterviewSettings {
    fn default() -> Self {
        Self {
            opening_aim: "Collect the interviewee's background".to_string(),
            opening_question: "Please describe the interviewee's basic information".to_string(),
            event_buffer: 32,
        }
    }
}

/// Live progress feed of one turn.
#[derive(Debug)]
pub struct InterviewStream {
    pub session_id: SessionId,
    pub events: mpsc::Receiver<ProgressEvent>,
}

impl InterviewStream {
    pub fn into_stream(self) -> ReceiverStream<ProgressEvent> {
        ReceiverStream::new(self.events)
    }
}

/// Why a relay stopped without delivering a terminal event itself.
enum RelayHalt {
    Cancelled,
    Failed(TurnError, TurnSnapshot),
}

impl From<TurnError> for RelayHalt {
    fn from(err: TurnError) -> Self {
        RelayHalt::Failed(err, TurnSnapshot::new())
    }
}

/// Application service for running interviews.
#[derive(Clone)]
pub struct InterviewService {
    repository: Arc<dyn InterviewRepository>,
    reader: Arc<dyn InterviewReader>,
    history: SessionHistoryBuilder,
    orchestrator: TurnOrchestrator,
    reconciler: PersistenceReconciler,
    locks: Arc<SessionLocks>,
    settings: InterviewSettings,
}

impl InterviewService {
    pub fn new(
        repository: Arc<dyn InterviewRepository>,
        reader: Arc<dyn InterviewReader>,
        orchestrator: TurnOrchestrator,
        settings: InterviewSettings,
    ) -> Self {
        Self {
            history: SessionHistoryBuilder::new(Arc::clone(&repository)),
            reconciler: PersistenceReconciler::new(Arc::clone(&repository)),
            repository,
            reader,
            orchestrator,
            locks: Arc::new(SessionLocks::new()),
            settings,
        }
    }

    pub fn settings(&self) -> &InterviewSettings {
        &self.settings
    }

    /// Creates a session with its opening turn and processes the first
    /// answer against it.
    ///
    /// # Errors
    ///
    /// - `Validation` if `answer` is blank
    /// - `Persistence` if the session and its first turn can't be stored
    pub async fn start_interview(&self, answer: &str) -> Result<InterviewStream, TurnError> {
        require_non_blank("input", answer)?;

        let session = Session::start();
        let opening = Turn::open(
            *session.id(),
            self.settings.opening_aim.as_str(),
            self.settings.opening_question.as_str(),
        );
        self.repository
            .start_session(&session, &opening)
            .await
            .map_err(|e| TurnError::from_store(e, &TurnSnapshot::new()))?;
        info!(session_id = %session.id(), "interview started");

        self.continue_interview(*session.id(), answer).await
    }

    /// Processes `answer` against the session's open turn.
    ///
    /// # Errors
    ///
    /// - `Validation` if `answer` is blank
    ///
    /// Unknown sessions, finished sessions, a missing open turn and a turn
    /// already in flight are reported as the stream's terminal `error`.
    pub async fn continue_interview(
        &self,
        session_id: SessionId,
        answer: &str,
    ) -> Result<InterviewStream, TurnError> {
        require_non_blank("input", answer)?;

        let (tx, rx) = mpsc::channel(self.settings.event_buffer.max(1));
        let service = self.clone();
        let answer = answer.to_string();
        tokio::spawn(async move { service.relay(session_id, answer, tx).await });

        Ok(InterviewStream {
            session_id,
            events: rx,
        })
    }

    /// All sessions with their turns and flagged snippets, oldest first.
    pub async fn list_sessions(&self) -> Result<Vec<SessionView>, DomainError> {
        self.reader.list_sessions().await
    }

    /// One session with its turns.
    pub async fn session(&self, session_id: &SessionId) -> Result<Option<SessionView>, DomainError> {
        self.reader.get_session(session_id).await
    }

    /// Human-readable transcript of a session.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the session doesn't exist
    pub async fn transcript(&self, session_id: &SessionId) -> Result<String, DomainError> {
        if self.repository.find_session(session_id).await?.is_none() {
            return Err(DomainError::new(
                ErrorCode::SessionNotFound,
                format!("Session {} does not exist", session_id),
            ));
        }
        self.history.transcript(session_id).await
    }

    async fn relay(self, session_id: SessionId, answer: String, tx: mpsc::Sender<ProgressEvent>) {
        match self.run_turn(session_id, &answer, &tx).await {
            Ok(()) => {}
            Err(RelayHalt::Cancelled) => {
                info!(session_id = %session_id, "client went away, turn left open");
            }
            Err(RelayHalt::Failed(err, snapshot)) => {
                warn!(session_id = %session_id, kind = err.kind(), error = %err, "turn not committed");
                let _ = tx.send(ProgressEvent::failed(err.to_string(), &snapshot)).await;
            }
        }
    }

    async fn run_turn(
        &self,
        session_id: SessionId,
        answer: &str,
        tx: &mpsc::Sender<ProgressEvent>,
    ) -> Result<(), RelayHalt> {
        let _guard = self.locks.try_acquire(session_id).await.ok_or_else(|| {
            TurnError::consistency(
                ErrorCode::TurnInProgress,
                format!("A turn is already being processed for session {}", session_id),
            )
        })?;

        let session = self
            .repository
            .find_session(&session_id)
            .await
            .map_err(|e| TurnError::from_store(e, &TurnSnapshot::new()))?
            .ok_or_else(|| {
                TurnError::consistency(
                    ErrorCode::SessionNotFound,
                    format!("Session {} does not exist", session_id),
                )
            })?;
        session
            .ensure_accepts_answers()
            .map_err(TurnError::Consistency)?;

        let context = self
            .history
            .build_context(&session_id)
            .await
            .map_err(|e| TurnError::from_store(e, &TurnSnapshot::new()))?;
        let open_turn_id = context.open_turn_id().ok_or_else(|| {
            TurnError::consistency(
                ErrorCode::TurnNotFound,
                format!("Session {} has no open turn", session_id),
            )
        })?;

        let mut events = self
            .orchestrator
            .process_turn(context.with_answer(answer), answer);

        loop {
            let next = tokio::select! {
                _ = tx.closed() => return Err(RelayHalt::Cancelled),
                next = events.recv() => next,
            };
            let Some(event) = next else {
                return Err(TurnError::consistency(
                    ErrorCode::InternalError,
                    "turn pipeline stopped without a result",
                )
                .into());
            };

            match event.kind {
                EventKind::Final => {
                    let cmd = CommitTurnCommand {
                        session_id,
                        open_turn_id,
                        answer: answer.to_string(),
                        snapshot: event.snapshot.clone(),
                    };
                    self.reconciler
                        .commit_turn(&cmd)
                        .await
                        .map_err(|err| RelayHalt::Failed(err, event.snapshot.clone()))?;
                    return forward(tx, event).await;
                }
                EventKind::Error => return forward(tx, event).await,
                _ => forward(tx, event).await?,
            }
        }
    }
}

async fn forward(tx: &mpsc::Sender<ProgressEvent>, event: ProgressEvent) -> Result<(), RelayHalt> {
    tx.send(event).await.map_err(|_| RelayHalt::Cancelled)
}
