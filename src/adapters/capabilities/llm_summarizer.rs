//! LLM-backed memoir summarizer.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::prompts::SUMMARY_SYSTEM_PROMPT;
use super::provider_failure;
use crate::domain::pipeline::CapabilityKind;
use crate::ports::{AIProvider, CapabilityError, CompletionRequest, MessageRole, Summarizer};

pub struct LlmSummarizer {
    ai_provider: Arc<dyn AIProvider>,
}

impl LlmSummarizer {
    pub fn new(ai_provider: Arc<dyn AIProvider>) -> Self {
        Self { ai_provider }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, history: &str) -> Result<String, CapabilityError> {
        let request = CompletionRequest::new("summary")
            .with_system_prompt(SUMMARY_SYSTEM_PROMPT)
            .with_message(MessageRole::User, history);

        let response = self
            .ai_provider
            .complete(request)
            .await
            .map_err(|e| provider_failure(CapabilityKind::Summarizer, e))?;

        let draft = response.content.trim();
        if draft.is_empty() {
            return Err(CapabilityError::malformed(
                CapabilityKind::Summarizer,
                "empty draft",
            ));
        }
        info!(chars = draft.chars().count(), tokens = response.usage.total_tokens, "draft written");
        Ok(draft.to_string())
    }
}
