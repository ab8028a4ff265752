//! Interview pipeline configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::handlers::{InterviewSettings, OrchestratorConfig};

/// Interview pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct InterviewConfig {
    /// Deadline for each capability call in seconds
    #[serde(default = "default_capability_timeout")]
    pub capability_timeout_secs: u64,

    /// Aim of the first turn of every session
    #[serde(default = "default_opening_aim")]
    pub opening_aim: String,

    /// Question of the first turn of every session
    #[serde(default = "default_opening_question")]
    pub opening_question: String,

    /// Capacity of the progress event channels
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl InterviewConfig {
    pub fn capability_timeout(&self) -> Duration {
        Duration::from_secs(self.capability_timeout_secs)
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            capability_timeout: self.capability_timeout(),
            event_buffer: self.event_buffer,
        }
    }

    pub fn settings(&self) -> InterviewSettings {
        InterviewSettings {
            opening_aim: self.opening_aim.clone(),
            opening_question: self.opening_question.clone(),
            event_buffer: self.event_buffer,
        }
    }

    /// Validate interview configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.capability_timeout_secs == 0 || self.capability_timeout_secs > 600 {
            return Err(ValidationError::InvalidCapabilityTimeout);
        }
        if self.event_buffer == 0 {
            return Err(ValidationError::InvalidEventBuffer);
        }
        if self.opening_aim.trim().is_empty() {
            return Err(ValidationError::BlankOpening("aim"));
        }
        if self.opening_question.trim().is_empty() {
            return Err(ValidationError::BlankOpening("question"));
        }
        Ok(())
    }
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            capability_timeout_secs: default_capability_timeout(),
            opening_aim: default_opening_aim(),
            opening_question: default_opening_question(),
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_capability_timeout() -> u64 {
    120
}

fn default_opening_aim() -> String {
    InterviewSettings::default().opening_aim
}

fn default_opening_question() -> String {
    InterviewSettings::default().opening_question
}

fn default_event_buffer() -> usize {
    32
}
