//! LLM-backed emotion classifier.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::prompts::EMOTION_SYSTEM_PROMPT;
use super::provider_failure;
use crate::domain::interview::DEFAULT_EMOTION;
use crate::domain::pipeline::CapabilityKind;
use crate::ports::{AIProvider, CapabilityError, CompletionRequest, EmotionClassifier, MessageRole};

/// Labels the answer positive, neutral or negative.
pub struct LlmEmotionClassifier {
    ai_provider: Arc<dyn AIProvider>,
}

impl LlmEmotionClassifier {
    pub fn new(ai_provider: Arc<dyn AIProvider>) -> Self {
        Self { ai_provider }
    }
}

/// Maps free-form model output onto the three labels. Anything
/// unrecognised is treated as neutral.
pub fn normalize_label(raw: &str) -> &'static str {
    let word = raw
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    if word.starts_with("pos") {
        "positive"
    } else if word.starts_with("neg") {
        "negative"
    } else {
        DEFAULT_EMOTION
    }
}

#[async_trait]
impl EmotionClassifier for LlmEmotionClassifier {
    async fn classify(&self, text: &str) -> Result<String, CapabilityError> {
        let request = CompletionRequest::new("emotion")
            .with_system_prompt(EMOTION_SYSTEM_PROMPT)
            .with_message(MessageRole::User, text)
            .with_max_tokens(8);

        let response = self
            .ai_provider
            .complete(request)
            .await
            .map_err(|e| provider_failure(CapabilityKind::EmotionClassifier, e))?;

        let label = normalize_label(&response.content);
        debug!(raw = %response.content, label, "classified emotion");
        Ok(label.to_string())
    }
}
