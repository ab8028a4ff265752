//! Scripted capability fakes.
//!
//! Deterministic stand-ins for the four capability ports, used by the unit
//! and integration test suites.
//!
//! # Features
//!
//! - Fixed result or injected failure per fake
//! - Simulated latency for timeout and cancellation testing
//! - Call counting and input capture for verification
//!
//! # Example
//!
//! ```ignore
//! let advisor = ScriptedDialogueAdvisor::continuing("50%", "Childhood", "Where did you grow up?")
//!     .with_updates(vec![AdvisorUpdate::Status("thinking".into())]);
//! ```

use async_trait::async_trait;
use futures::stream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::pipeline::CapabilityKind;
use crate::ports::{
    AdvisorStream, AdvisorUpdate, AdvisorVerdict, CapabilityError, DialogueAdvisor,
    EmotionClassifier, FactChecker, Summarizer,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Bookkeeping shared by every fake.
#[derive(Debug, Default)]
struct Script {
    delay: Duration,
    calls: AtomicUsize,
    inputs: Mutex<Vec<String>>,
}

impl Script {
    async fn enter(&self, input: &str) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.inputs).push(input.to_string());
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_input(&self) -> Option<String> {
        lock(&self.inputs).last().cloned()
    }
}

/// Emotion classifier returning a fixed label.
#[derive(Debug, Clone)]
pub struct ScriptedEmotionClassifier {
    result: Result<String, CapabilityError>,
    script: Arc<Script>,
}

impl ScriptedEmotionClassifier {
    pub fn returning(label: impl Into<String>) -> Self {
        Self {
            result: Ok(label.into()),
            script: Arc::default(),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            result: Err(CapabilityError::failed(
                CapabilityKind::EmotionClassifier,
                message,
            )),
            script: Arc::default(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.script = Arc::new(Script {
            delay,
            ..Script::default()
        });
        self
    }

    pub fn call_count(&self) -> usize {
        self.script.calls()
    }

    pub fn last_input(&self) -> Option<String> {
        self.script.last_input()
    }
}

#[async_trait]
impl EmotionClassifier for ScriptedEmotionClassifier {
    async fn classify(&self, text: &str) -> Result<String, CapabilityError> {
        self.script.enter(text).await;
        self.result.clone()
    }
}

/// Fact checker returning a fixed list of snippets.
#[derive(Debug, Clone)]
pub struct ScriptedFactChecker {
    result: Result<Vec<String>, CapabilityError>,
    script: Arc<Script>,
}

impl ScriptedFactChecker {
    pub fn returning(snippets: Vec<String>) -> Self {
        Self {
            result: Ok(snippets),
            script: Arc::default(),
        }
    }

    pub fn clean() -> Self {
        Self::returning(Vec::new())
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            result: Err(CapabilityError::failed(CapabilityKind::FactChecker, message)),
            script: Arc::default(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.script = Arc::new(Script {
            delay,
            ..Script::default()
        });
        self
    }

    pub fn call_count(&self) -> usize {
        self.script.calls()
    }

    pub fn last_input(&self) -> Option<String> {
        self.script.last_input()
    }
}

#[async_trait]
impl FactChecker for ScriptedFactChecker {
    async fn check(&self, text: &str) -> Result<Vec<String>, CapabilityError> {
        self.script.enter(text).await;
        self.result.clone()
    }
}

/// Dialogue advisor replaying a fixed sequence of updates.
#[derive(Debug, Clone)]
pub struct ScriptedDialogueAdvisor {
    updates: Vec<Result<AdvisorUpdate, CapabilityError>>,
    script: Arc<Script>,
}

impl ScriptedDialogueAdvisor {
    /// Ends with a verdict that opens another turn.
    pub fn continuing(
        process: impl Into<String>,
        aim: impl Into<String>,
        question: impl Into<String>,
    ) -> Self {
        Self::with_verdict(AdvisorVerdict {
            process: process.into(),
            aim: aim.into(),
            question: question.into(),
            is_finished: false,
        })
    }

    /// Ends with a verdict that closes the interview.
    pub fn finishing(process: impl Into<String>) -> Self {
        Self::with_verdict(AdvisorVerdict {
            process: process.into(),
            aim: String::new(),
            question: String::new(),
            is_finished: true,
        })
    }

    pub fn with_verdict(verdict: AdvisorVerdict) -> Self {
        Self {
            updates: vec![Ok(AdvisorUpdate::Verdict(verdict))],
            script: Arc::default(),
        }
    }

    /// A stream that fails instead of delivering a verdict.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            updates: vec![Err(CapabilityError::malformed(
                CapabilityKind::DialogueAdvisor,
                message,
            ))],
            script: Arc::default(),
        }
    }

    /// A stream that ends without ever producing a verdict.
    pub fn silent() -> Self {
        Self {
            updates: Vec::new(),
            script: Arc::default(),
        }
    }

    /// Prepends intermediate notifications before the scripted ending.
    pub fn with_updates(mut self, updates: Vec<AdvisorUpdate>) -> Self {
        let tail = std::mem::take(&mut self.updates);
        self.updates = updates.into_iter().map(Ok).chain(tail).collect();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.script = Arc::new(Script {
            delay,
            ..Script::default()
        });
        self
    }

    pub fn call_count(&self) -> usize {
        self.script.calls()
    }

    pub fn last_input(&self) -> Option<String> {
        self.script.last_input()
    }
}

#[async_trait]
impl DialogueAdvisor for ScriptedDialogueAdvisor {
    async fn advise(&self, history: &str) -> Result<AdvisorStream, CapabilityError> {
        self.script.enter(history).await;
        Ok(Box::pin(stream::iter(self.updates.clone())))
    }
}

/// Summarizer returning a fixed draft.
#[derive(Debug, Clone)]
pub struct ScriptedSummarizer {
    result: Result<String, CapabilityError>,
    script: Arc<Script>,
}

impl ScriptedSummarizer {
    pub fn returning(draft: impl Into<String>) -> Self {
        Self {
            result: Ok(draft.into()),
            script: Arc::default(),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            result: Err(CapabilityError::failed(CapabilityKind::Summarizer, message)),
            script: Arc::default(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.script = Arc::new(Script {
            delay,
            ..Script::default()
        });
        self
    }

    pub fn call_count(&self) -> usize {
        self.script.calls()
    }

    pub fn last_input(&self) -> Option<String> {
        self.script.last_input()
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    async fn summarize(&self, history: &str) -> Result<String, CapabilityError> {
        self.script.enter(history).await;
        self.result.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn classifier_counts_calls_and_captures_input() {
        let classifier = ScriptedEmotionClassifier::returning("positive");
        assert_eq!(classifier.classify("hello").await.unwrap(), "positive");
        assert_eq!(classifier.call_count(), 1);
        assert_eq!(classifier.last_input().as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn clones_share_call_counter() {
        let checker = ScriptedFactChecker::clean();
        let handle = checker.clone();
        checker.check("x").await.unwrap();
        assert_eq!(handle.call_count(), 1);
    }

    #[tokio::test]
    async fn advisor_replays_updates_then_verdict() {
        let advisor = ScriptedDialogueAdvisor::continuing("10%", "aim", "q")
            .with_updates(vec![AdvisorUpdate::Status("thinking".into())]);

        let updates: Vec<_> = advisor.advise("h").await.unwrap().collect().await;
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0], Ok(AdvisorUpdate::Status("thinking".into())));
        assert!(matches!(updates[1], Ok(AdvisorUpdate::Verdict(_))));
    }

    #[tokio::test]
    async fn failing_summarizer_reports_capability() {
        let err = ScriptedSummarizer::failing("down")
            .summarize("h")
            .await
            .unwrap_err();
        assert_eq!(err.capability(), CapabilityKind::Summarizer);
    }
}
