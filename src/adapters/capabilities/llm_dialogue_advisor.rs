//! LLM-backed dialogue advisor.
//!
//! Streams the model output as `Content` updates while collecting it, then
//! parses the collected text into the verdict. If the streaming request
//! cannot be opened, a single non-streaming completion is tried instead.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::warn;

use super::json_payload::parse_verdict;
use super::prompts::DIALOGUE_SYSTEM_PROMPT;
use super::provider_failure;
use crate::domain::pipeline::CapabilityKind;
use crate::ports::{
    AIProvider, AdvisorStream, AdvisorUpdate, CapabilityError, CompletionRequest,
    CompletionStream, DialogueAdvisor, MessageRole,
};

const KIND: CapabilityKind = CapabilityKind::DialogueAdvisor;

pub const ADVISING_STATUS: &str = "Planning the next question";

pub struct LlmDialogueAdvisor {
    ai_provider: Arc<dyn AIProvider>,
}

impl LlmDialogueAdvisor {
    pub fn new(ai_provider: Arc<dyn AIProvider>) -> Self {
        Self { ai_provider }
    }
}

fn malformed(reason: String) -> CapabilityError {
    warn!(%reason, "unparseable dialogue advice");
    CapabilityError::malformed(KIND, reason)
}

struct Relay {
    chunks: CompletionStream,
    collected: String,
    done: bool,
}

/// Forwards each delta, then yields the verdict parsed from everything seen.
fn relay(chunks: CompletionStream) -> AdvisorStream {
    let opening = stream::iter([Ok(AdvisorUpdate::Status(ADVISING_STATUS.to_string()))]);
    let state = Relay {
        chunks,
        collected: String::new(),
        done: false,
    };

    let body = stream::unfold(state, |mut relay| async move {
        if relay.done {
            return None;
        }
        loop {
            match relay.chunks.next().await {
                Some(Ok(chunk)) if chunk.delta.is_empty() => continue,
                Some(Ok(chunk)) => {
                    relay.collected.push_str(&chunk.delta);
                    return Some((Ok(AdvisorUpdate::Content(chunk.delta)), relay));
                }
                Some(Err(err)) => {
                    relay.done = true;
                    return Some((Err(provider_failure(KIND, err)), relay));
                }
                None => {
                    relay.done = true;
                    let verdict = parse_verdict(&relay.collected)
                        .map(AdvisorUpdate::Verdict)
                        .map_err(malformed);
                    return Some((verdict, relay));
                }
            }
        }
    });

    opening.chain(body).boxed()
}

#[async_trait]
impl DialogueAdvisor for LlmDialogueAdvisor {
    async fn advise(&self, history: &str) -> Result<AdvisorStream, CapabilityError> {
        let request = CompletionRequest::new("dialogue")
            .with_system_prompt(DIALOGUE_SYSTEM_PROMPT)
            .with_message(MessageRole::User, history);

        match self.ai_provider.stream_complete(request.clone()).await {
            Ok(chunks) => Ok(relay(chunks)),
            Err(err) => {
                warn!(error = %err, "streaming advice failed, falling back to a single completion");
                let response = self
                    .ai_provider
                    .complete(request)
                    .await
                    .map_err(|e| provider_failure(KIND, e))?;
                let verdict = parse_verdict(&response.content).map_err(malformed)?;
                Ok(stream::iter([
                    Ok(AdvisorUpdate::Status(ADVISING_STATUS.to_string())),
                    Ok(AdvisorUpdate::Content(response.content)),
                    Ok(AdvisorUpdate::Verdict(verdict)),
                ])
                .boxed())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use crate::ports::{AIError, AdvisorVerdict};

    const CONTINUE: &str =
        r#"{"process": "20%", "aim": "Childhood", "question": "Where did you grow up?", "is_finished": false}"#;

    async fn collect(stream: AdvisorStream) -> Vec<Result<AdvisorUpdate, CapabilityError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn streams_content_then_verdict() {
        let provider = Arc::new(MockAIProvider::new().with_response(CONTINUE));
        let advisor = LlmDialogueAdvisor::new(provider);

        let updates = collect(advisor.advise("aim: a\nquestion: q\nanswer: x\n").await.unwrap()).await;

        assert_eq!(
            updates.first(),
            Some(&Ok(AdvisorUpdate::Status(ADVISING_STATUS.to_string())))
        );
        let streamed: String = updates
            .iter()
            .filter_map(|u| match u {
                Ok(AdvisorUpdate::Content(text)) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(streamed, CONTINUE);
        assert_eq!(
            updates.last(),
            Some(&Ok(AdvisorUpdate::Verdict(AdvisorVerdict {
                process: "20%".into(),
                aim: "Childhood".into(),
                question: "Where did you grow up?".into(),
                is_finished: false,
            })))
        );
    }

    #[tokio::test]
    async fn unparseable_stream_ends_in_malformed() {
        let provider = Arc::new(MockAIProvider::new().with_response("I am not sure what to ask."));
        let advisor = LlmDialogueAdvisor::new(provider);

        let updates = collect(advisor.advise("history").await.unwrap()).await;
        assert!(matches!(
            updates.last(),
            Some(Err(CapabilityError::Malformed { .. }))
        ));
    }

    #[tokio::test]
    async fn falls_back_to_single_completion_when_streaming_fails() {
        let provider = Arc::new(
            MockAIProvider::new()
                .with_error(AIError::unavailable("stream refused"))
                .with_response(r#"{"process": "100%", "aim": "", "question": "", "is_finished": 1}"#),
        );
        let advisor = LlmDialogueAdvisor::new(provider.clone());

        let updates = collect(advisor.advise("history").await.unwrap()).await;

        assert_eq!(provider.call_count(), 2);
        match updates.last() {
            Some(Ok(AdvisorUpdate::Verdict(verdict))) => assert!(verdict.is_finished),
            other => panic!("expected verdict, got {:?}", other),
        }
    }
}
