//! Turn orchestrator.
//!
//! Runs the capability pipeline for one answered turn and reports progress
//! as a stream of [`ProgressEvent`]s:
//!
//! 1. classify the answer's emotion
//! 2. fact-check the answer
//! 3. ask the dialogue advisor what to do next, relaying its notifications
//! 4. summarize the interview if the advisor says it is finished
//!
//! Every run ends with exactly one terminal event, `final` or `error`,
//! unless the consumer goes away first. Dropping the receiver abandons the
//! in-flight capability call and no further calls are issued.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::domain::foundation::{require_non_blank, DomainError, ErrorCode, StateMachine};
use crate::domain::interview::TurnError;
use crate::domain::pipeline::{CapabilityKind, EventKind, ProgressEvent, TurnSnapshot, TurnStage};
use crate::ports::{
    AdvisorUpdate, AdvisorVerdict, CapabilityError, DialogueAdvisor, EmotionClassifier,
    FactChecker, Summarizer,
};

/// The external services a turn is processed with.
#[derive(Clone)]
pub struct Capabilities {
    pub emotion: Arc<dyn EmotionClassifier>,
    pub fact_checker: Arc<dyn FactChecker>,
    pub advisor: Arc<dyn DialogueAdvisor>,
    pub summarizer: Arc<dyn Summarizer>,
}

/// Orchestrator tuning.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Deadline for each capability call, including the whole advisor stream.
    pub capability_timeout: Duration,
    /// Capacity of the progress event channel.
    pub event_buffer: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            capability_timeout: Duration::from_secs(120),
            event_buffer: 32,
        }
    }
}

/// Drives one turn through the capability pipeline.
#[derive(Clone)]
pub struct TurnOrchestrator {
    capabilities: Capabilities,
    config: OrchestratorConfig,
}

impl TurnOrchestrator {
    pub fn new(capabilities: Capabilities) -> Self {
        Self::with_config(capabilities, OrchestratorConfig::default())
    }

    pub fn with_config(capabilities: Capabilities, config: OrchestratorConfig) -> Self {
        Self {
            capabilities,
            config,
        }
    }

    /// Starts processing `answer` against the rendered `context`.
    ///
    /// `context` must already contain the answer appended to the open turn.
    /// Returns the receiving end of the progress feed immediately; the
    /// pipeline runs on a spawned task.
    pub fn process_turn(
        &self,
        context: impl Into<String>,
        answer: impl Into<String>,
    ) -> mpsc::Receiver<ProgressEvent> {
        let (tx, rx) = mpsc::channel(self.config.event_buffer.max(1));
        let run = TurnRun {
            capabilities: self.capabilities.clone(),
            timeout: self.config.capability_timeout,
            tx,
            snapshot: TurnSnapshot::new(),
            stage: TurnStage::AwaitingAnswer,
        };
        tokio::spawn(run.execute(context.into(), answer.into()));
        rx
    }
}

/// Why a run stopped early.
enum Halt {
    /// The consumer dropped the receiver.
    Cancelled,
    Failed(TurnError),
}

impl From<TurnError> for Halt {
    fn from(err: TurnError) -> Self {
        Halt::Failed(err)
    }
}

impl From<CapabilityError> for Halt {
    fn from(err: CapabilityError) -> Self {
        Halt::Failed(err.into())
    }
}

/// State of a single pipeline run.
struct TurnRun {
    capabilities: Capabilities,
    timeout: Duration,
    tx: mpsc::Sender<ProgressEvent>,
    snapshot: TurnSnapshot,
    stage: TurnStage,
}

impl TurnRun {
    async fn execute(mut self, context: String, answer: String) {
        info!(answer_len = answer.len(), "processing turn");

        match self.drive(&context, &answer).await {
            Ok(()) => {
                let event = ProgressEvent::completed(&self.snapshot);
                if self.tx.send(event).await.is_err() {
                    debug!("turn finished after consumer went away");
                }
                info!(
                    is_finished = self.snapshot.is_finished(),
                    dubious = self.snapshot.dubious_snippets().len(),
                    "turn processed"
                );
            }
            Err(Halt::Failed(err)) => {
                warn!(stage = %self.stage, kind = err.kind(), error = %err, "turn failed");
                self.stage = TurnStage::Failed;
                let _ = self
                    .tx
                    .send(ProgressEvent::failed(err.to_string(), &self.snapshot))
                    .await;
            }
            Err(Halt::Cancelled) => {
                info!(stage = %self.stage, "turn abandoned by consumer");
            }
        }
    }

    async fn drive(&mut self, context: &str, answer: &str) -> Result<(), Halt> {
        require_non_blank("context", context).map_err(TurnError::from)?;
        require_non_blank("input", answer).map_err(TurnError::from)?;

        self.enter(TurnStage::EvaluatingEmotion)?;
        let emotion = Arc::clone(&self.capabilities.emotion);
        let label = self
            .call(CapabilityKind::EmotionClassifier, emotion.classify(answer))
            .await?;
        self.snapshot.record_emotion(label.clone());
        self.emit(EventKind::Emotion, label).await?;

        self.enter(TurnStage::CheckingFacts)?;
        let fact_checker = Arc::clone(&self.capabilities.fact_checker);
        let dubious = self
            .call(CapabilityKind::FactChecker, fact_checker.check(answer))
            .await?;
        let message = format!("Found {} dubious item(s)", dubious.len());
        self.snapshot.record_dubious(dubious);
        self.emit(EventKind::Dubious, message).await?;

        self.enter(TurnStage::AdvisingNextStep)?;
        let verdict = self.advise(context).await?;
        self.snapshot.record_process(verdict.process.clone());
        self.emit(EventKind::Process, verdict.process.clone()).await?;
        self.snapshot.record_finished(verdict.is_finished);
        self.emit(EventKind::IsFinished, verdict.is_finished.to_string())
            .await?;

        if verdict.is_finished {
            self.enter(TurnStage::Summarizing)?;
            let summarizer = Arc::clone(&self.capabilities.summarizer);
            let draft = self
                .call(CapabilityKind::Summarizer, summarizer.summarize(context))
                .await?;
            self.snapshot.record_draft(draft.clone());
            self.emit(EventKind::Draft, draft).await?;
        } else {
            self.enter(TurnStage::NextQuestionReady)?;
            self.snapshot.record_aim(verdict.aim.clone());
            self.emit(EventKind::Aim, verdict.aim.clone()).await?;
            self.snapshot.record_question(verdict.question.clone());
            self.emit(EventKind::Question, verdict.question).await?;
        }

        self.enter(TurnStage::Closed)?;
        Ok(())
    }

    /// Consumes the advisor stream, relaying notifications until the verdict.
    async fn advise(&mut self, context: &str) -> Result<AdvisorVerdict, Halt> {
        let kind = CapabilityKind::DialogueAdvisor;
        let deadline = Instant::now() + self.timeout;
        let advisor = Arc::clone(&self.capabilities.advisor);
        let mut updates = self
            .guard(kind, deadline, advisor.advise(context))
            .await??;

        loop {
            let next = self.guard(kind, deadline, updates.next()).await?;
            match next {
                Some(Ok(AdvisorUpdate::Status(message))) => {
                    self.emit(EventKind::Status, message).await?
                }
                Some(Ok(AdvisorUpdate::Content(delta))) => {
                    self.emit(EventKind::Content, delta).await?
                }
                Some(Ok(AdvisorUpdate::Verdict(verdict))) => return Ok(verdict),
                Some(Err(err)) => return Err(err.into()),
                None => {
                    return Err(CapabilityError::malformed(
                        kind,
                        "stream ended without a decision",
                    )
                    .into())
                }
            }
        }
    }

    /// One capability call under its own deadline.
    async fn call<T, F>(&self, kind: CapabilityKind, fut: F) -> Result<T, Halt>
    where
        F: Future<Output = Result<T, CapabilityError>>,
    {
        let deadline = Instant::now() + self.timeout;
        Ok(self.guard(kind, deadline, fut).await??)
    }

    /// Races `fut` against the deadline and the consumer hanging up.
    async fn guard<T, F>(&self, kind: CapabilityKind, deadline: Instant, fut: F) -> Result<T, Halt>
    where
        F: Future<Output = T>,
    {
        debug!(stage = %self.stage, capability = %kind, "awaiting capability");
        tokio::select! {
            _ = self.tx.closed() => Err(Halt::Cancelled),
            result = timeout_at(deadline, fut) => result.map_err(|_| {
                Halt::from(CapabilityError::timeout(kind, self.timeout.as_secs()))
            }),
        }
    }

    fn enter(&mut self, next: TurnStage) -> Result<(), Halt> {
        self.stage = self.stage.transition_to(next).map_err(|e| {
            TurnError::Consistency(DomainError::new(
                ErrorCode::InvalidStateTransition,
                e.to_string(),
            ))
        })?;
        Ok(())
    }

    async fn emit(&self, kind: EventKind, message: impl Into<String>) -> Result<(), Halt> {
        self.tx
            .send(ProgressEvent::new(kind, message, &self.snapshot))
            .await
            .map_err(|_| Halt::Cancelled)
    }
}
