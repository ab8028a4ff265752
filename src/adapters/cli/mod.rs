//! Interactive console.
//!
//! Drives an interview from a terminal: prints the open question, reads one
//! answer per line, shows pipeline progress and the next question. Typing
//! `exit` or `quit` (or closing stdin) leaves the session open for a later
//! `resume`.

use std::io::Write;

use futures::StreamExt;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::application::handlers::{InterviewService, InterviewStream};
use crate::domain::foundation::{DomainError, SessionId};
use crate::domain::interview::TurnError;
use crate::domain::pipeline::EventKind;
use crate::ports::InterviewReader;

const RULE: &str = "----------------------------------------";

/// Console failures.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("console I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Turn(#[from] TurnError),

    #[error(transparent)]
    Store(#[from] DomainError),

    #[error("session {0} does not exist")]
    SessionNotFound(SessionId),
}

/// Prints one line per stored session. Reads the store directly, so listing
/// works without an AI provider configured.
pub async fn list_sessions<W: Write>(
    reader: &dyn InterviewReader,
    out: &mut W,
) -> Result<(), CliError> {
    let sessions = reader.list_sessions().await?;
    if sessions.is_empty() {
        writeln!(out, "No sessions yet.")?;
    }
    for session in sessions {
        writeln!(
            out,
            "{}  {}  {:>3} turns  {}",
            session.id,
            session.created_at.to_rfc3339(),
            session.turns.len(),
            if session.is_finished { "finished" } else { "open" }
        )?;
    }
    Ok(())
}

/// How a streamed turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TurnEnd {
    Next(String),
    Finished(Option<String>),
    Failed(String),
}

pub struct Console<R, W> {
    service: InterviewService,
    input: Lines<R>,
    out: W,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(service: InterviewService, input: R, out: W) -> Self {
        Self {
            service,
            input: input.lines(),
            out,
        }
    }

    /// Starts a new session with the configured opening question.
    pub async fn run_new(&mut self) -> Result<(), CliError> {
        let opening = self.service.settings().opening_question.clone();
        writeln!(self.out, "{}", RULE)?;
        writeln!(self.out, "Q: {}", opening)?;

        let stream = loop {
            let Some(answer) = self.prompt().await? else {
                return Ok(());
            };
            match self.service.start_interview(&answer).await {
                Ok(stream) => break stream,
                Err(TurnError::Validation(e)) => writeln!(self.out, "! {}", e)?,
                Err(e) => return Err(e.into()),
            }
        };

        let session_id = stream.session_id;
        writeln!(self.out, "Session {}", session_id)?;
        match self.render(stream).await? {
            TurnEnd::Next(question) => writeln!(self.out, "Q: {}", question)?,
            TurnEnd::Finished(draft) => return self.show_draft(draft.as_deref()),
            TurnEnd::Failed(message) => writeln!(self.out, "! {}", message)?,
        }
        self.converse(session_id).await
    }

    /// Prints the transcript so far and continues at the open question.
    pub async fn run_resume(&mut self, session_id: SessionId) -> Result<(), CliError> {
        let view = self
            .service
            .session(&session_id)
            .await?
            .ok_or(CliError::SessionNotFound(session_id))?;

        let transcript = self.service.transcript(&session_id).await?;
        write!(self.out, "{}", transcript)?;
        writeln!(self.out, "{}", RULE)?;

        if view.is_finished {
            return self.show_draft(view.draft.as_deref());
        }
        match view.open_turn().and_then(|t| t.question.clone()) {
            Some(question) => writeln!(self.out, "Q: {}", question)?,
            None => {
                writeln!(self.out, "! Session {} has no open question", session_id)?;
                return Ok(());
            }
        }
        self.converse(session_id).await
    }

    async fn converse(&mut self, session_id: SessionId) -> Result<(), CliError> {
        loop {
            let Some(answer) = self.prompt().await? else {
                writeln!(self.out, "Paused. Resume with: resume {}", session_id)?;
                return Ok(());
            };
            let stream = match self.service.continue_interview(session_id, &answer).await {
                Ok(stream) => stream,
                Err(TurnError::Validation(e)) => {
                    writeln!(self.out, "! {}", e)?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            match self.render(stream).await? {
                TurnEnd::Next(question) => writeln!(self.out, "Q: {}", question)?,
                TurnEnd::Finished(draft) => return self.show_draft(draft.as_deref()),
                TurnEnd::Failed(message) => {
                    writeln!(self.out, "! {}", message)?;
                    writeln!(self.out, "The question is still open; answer again or type exit.")?;
                }
            }
        }
    }

    /// `None` on end of input or an exit word.
    fn prompt_line(line: Option<String>) -> Option<String> {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
            return None;
        }
        Some(line)
    }

    async fn prompt(&mut self) -> Result<Option<String>, CliError> {
        write!(self.out, "> ")?;
        self.out.flush()?;
        let line = self.input.next_line().await?;
        Ok(Self::prompt_line(line))
    }

    async fn render(&mut self, stream: InterviewStream) -> Result<TurnEnd, CliError> {
        let mut events = stream.into_stream();
        while let Some(event) = events.next().await {
            match event.kind {
                EventKind::Status => writeln!(self.out, "... {}", event.message)?,
                EventKind::Content => {
                    write!(self.out, ".")?;
                    self.out.flush()?;
                }
                EventKind::Emotion => writeln!(self.out, "\nemotion: {}", event.message)?,
                EventKind::Dubious => {
                    writeln!(self.out, "{}", event.message)?;
                    for snippet in event.snapshot.dubious_snippets() {
                        writeln!(self.out, "  ? {}", snippet)?;
                    }
                }
                EventKind::Process => writeln!(self.out, "progress: {}", event.message)?,
                EventKind::Aim => writeln!(self.out, "aim: {}", event.message)?,
                EventKind::IsFinished | EventKind::Question | EventKind::Draft => {}
                EventKind::Final => {
                    let snapshot = event.snapshot;
                    return Ok(if snapshot.is_finished() {
                        TurnEnd::Finished(snapshot.draft().map(str::to_string))
                    } else {
                        TurnEnd::Next(snapshot.question().unwrap_or_default().to_string())
                    });
                }
                EventKind::Error => return Ok(TurnEnd::Failed(event.message)),
            }
        }
        Ok(TurnEnd::Failed("turn ended without a result".to_string()))
    }

    fn show_draft(&mut self, draft: Option<&str>) -> Result<(), CliError> {
        writeln!(self.out, "{}", RULE)?;
        writeln!(self.out, "Interview complete.")?;
        if let Some(draft) = draft {
            writeln!(self.out, "\n{}", draft)?;
        }
        Ok(())
    }
}
