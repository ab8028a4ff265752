//! Capability Ports - the four external services a turn depends on.
//!
//! Each port is a black box to the orchestrator. Adapters decide how the
//! answer is produced (LLM prompt, sentiment API, canned fake); the
//! orchestrator only relies on the shapes declared here.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;

use crate::domain::pipeline::CapabilityKind;

/// Tags a piece of text with an emotion label.
#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<String, CapabilityError>;
}

/// Extracts the fragments of a text that look factually questionable.
#[async_trait]
pub trait FactChecker: Send + Sync {
    async fn check(&self, text: &str) -> Result<Vec<String>, CapabilityError>;
}

/// Stream of advisor notifications ending in a verdict.
pub type AdvisorStream = Pin<Box<dyn Stream<Item = Result<AdvisorUpdate, CapabilityError>> + Send>>;

/// Decides what to ask next, or that the interview is complete.
///
/// The returned stream may yield any number of `Status`/`Content` updates
/// and must end with exactly one `Verdict` (or an error).
#[async_trait]
pub trait DialogueAdvisor: Send + Sync {
    async fn advise(&self, history: &str) -> Result<AdvisorStream, CapabilityError>;
}

/// Writes the final draft from the complete interview history.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, history: &str) -> Result<String, CapabilityError>;
}

/// One item of the dialogue advisor's stream.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvisorUpdate {
    /// Progress notice, forwarded to the caller unchanged.
    Status(String),
    /// Raw model output fragment, forwarded to the caller unchanged.
    Content(String),
    /// The structured decision. Ends the stream.
    Verdict(AdvisorVerdict),
}

/// Structured decision of the dialogue advisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorVerdict {
    /// Free-form progress estimate, stored on the answered turn.
    pub process: String,
    /// Goal of the next question.
    pub aim: String,
    pub question: String,
    pub is_finished: bool,
}

/// Capability failure. Aborts the turn; nothing is committed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("{capability} failed: {message}")]
    Failed {
        capability: CapabilityKind,
        message: String,
    },

    #[error("{capability} returned an unusable result: {message}")]
    Malformed {
        capability: CapabilityKind,
        message: String,
    },

    #[error("{capability} did not finish within {timeout_secs}s")]
    Timeout {
        capability: CapabilityKind,
        timeout_secs: u64,
    },
}

impl CapabilityError {
    pub fn failed(capability: CapabilityKind, message: impl Into<String>) -> Self {
        Self::Failed {
            capability,
            message: message.into(),
        }
    }

    pub fn malformed(capability: CapabilityKind, message: impl Into<String>) -> Self {
        Self::Malformed {
            capability,
            message: message.into(),
        }
    }

    pub fn timeout(capability: CapabilityKind, timeout_secs: u64) -> Self {
        Self::Timeout {
            capability,
            timeout_secs,
        }
    }

    pub fn capability(&self) -> CapabilityKind {
        match self {
            CapabilityError::Failed { capability, .. }
            | CapabilityError::Malformed { capability, .. }
            | CapabilityError::Timeout { capability, .. } => *capability,
        }
    }
}
