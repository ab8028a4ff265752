//! LLM-backed fact checker.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use super::json_payload::parse_dubious;
use super::prompts::FACT_CHECK_SYSTEM_PROMPT;
use super::provider_failure;
use crate::domain::pipeline::CapabilityKind;
use crate::ports::{AIProvider, CapabilityError, CompletionRequest, FactChecker, MessageRole};

pub struct LlmFactChecker {
    ai_provider: Arc<dyn AIProvider>,
}

impl LlmFactChecker {
    pub fn new(ai_provider: Arc<dyn AIProvider>) -> Self {
        Self { ai_provider }
    }
}

#[async_trait]
impl FactChecker for LlmFactChecker {
    async fn check(&self, text: &str) -> Result<Vec<String>, CapabilityError> {
        let request = CompletionRequest::new("fact_check")
            .with_system_prompt(FACT_CHECK_SYSTEM_PROMPT)
            .with_message(MessageRole::User, text);

        let response = self
            .ai_provider
            .complete(request)
            .await
            .map_err(|e| provider_failure(CapabilityKind::FactChecker, e))?;

        parse_dubious(&response.content).map_err(|reason| {
            warn!(%reason, "unparseable fact check response");
            CapabilityError::malformed(CapabilityKind::FactChecker, reason)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;

    #[tokio::test]
    async fn returns_flagged_fragments() {
        let provider = Arc::new(
            MockAIProvider::new()
                .with_response("Result:\n{\"dubious\": [\"the war ended in 1950\"]}"),
        );
        let checker = LlmFactChecker::new(provider);

        let snippets = checker.check("My father came home when the war ended in 1950.").await.unwrap();
        assert_eq!(snippets, vec!["the war ended in 1950"]);
    }

    #[tokio::test]
    async fn missing_field_is_malformed() {
        let provider = Arc::new(MockAIProvider::new().with_response("Looks fine to me."));
        let checker = LlmFactChecker::new(provider);

        let err = checker.check("text").await.unwrap_err();
        assert!(matches!(err, CapabilityError::Malformed { .. }));
    }
}
