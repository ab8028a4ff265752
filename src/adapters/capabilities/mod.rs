//! Capability adapters.
//!
//! - `Llm*` - capabilities backed by an `AIProvider`
//! - `Scripted*` - deterministic fakes for tests

mod json_payload;
mod llm_dialogue_advisor;
mod llm_emotion;
mod llm_fact_checker;
mod llm_summarizer;
mod prompts;
mod scripted;

pub use json_payload::{extract_object, parse_dubious, parse_verdict};
pub use llm_dialogue_advisor::{LlmDialogueAdvisor, ADVISING_STATUS};
pub use llm_emotion::{normalize_label, LlmEmotionClassifier};
pub use llm_fact_checker::LlmFactChecker;
pub use llm_summarizer::LlmSummarizer;
pub use scripted::{
    ScriptedDialogueAdvisor, ScriptedEmotionClassifier, ScriptedFactChecker, ScriptedSummarizer,
};

use std::sync::Arc;

use crate::application::handlers::Capabilities;
use crate::domain::pipeline::CapabilityKind;
use crate::ports::{AIError, AIProvider, CapabilityError};

fn provider_failure(capability: CapabilityKind, err: AIError) -> CapabilityError {
    match err {
        AIError::Timeout { timeout_secs } => {
            CapabilityError::timeout(capability, u64::from(timeout_secs))
        }
        other => CapabilityError::failed(capability, other.to_string()),
    }
}

/// Wires all four capabilities to one provider.
pub fn llm_capabilities(ai_provider: Arc<dyn AIProvider>) -> Capabilities {
    Capabilities {
        emotion: Arc::new(LlmEmotionClassifier::new(ai_provider.clone())),
        fact_checker: Arc::new(LlmFactChecker::new(ai_provider.clone())),
        advisor: Arc::new(LlmDialogueAdvisor::new(ai_provider.clone())),
        summarizer: Arc::new(LlmSummarizer::new(ai_provider)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_timeout_keeps_its_kind() {
        let err = provider_failure(
            CapabilityKind::FactChecker,
            AIError::Timeout { timeout_secs: 60 },
        );
        assert_eq!(err, CapabilityError::timeout(CapabilityKind::FactChecker, 60));
    }

    #[test]
    fn other_provider_errors_are_failures() {
        let err = provider_failure(CapabilityKind::Summarizer, AIError::AuthenticationFailed);
        assert!(matches!(err, CapabilityError::Failed { .. }));
    }
}
