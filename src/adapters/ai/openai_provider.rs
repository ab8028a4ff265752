//! OpenAI-compatible chat completion provider.
//!
//! Talks to any endpoint that speaks the OpenAI `chat/completions` protocol.
//! The defaults target DeepSeek's hosted `deepseek-chat` model.
//!
//! # Configuration
//!
//! ```ignore
//! let config = OpenAIConfig::new(api_key)
//!     .with_model("deepseek-chat")
//!     .with_base_url("https://api.deepseek.com/v1");
//!
//! let provider = OpenAIProvider::new(config)?;
//! ```
//!
//! # Streaming
//!
//! Responses are read as server-sent events. Byte chunks are buffered until a
//! full line is available, so a `data:` line split across network reads is
//! still parsed once.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::ports::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, CompletionStream, FinishReason,
    MessageRole, ProviderInfo, StreamChunk, TokenUsage,
};

pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// Configuration for the provider.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    api_key: Secret<String>,
    pub model: String,
    pub base_url: String,
    /// Used when a request does not set its own temperature.
    pub temperature: f32,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Maximum retries on transient failures.
    pub max_retries: u32,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::from_secret(Secret::new(api_key.into()))
    }

    pub fn from_secret(api_key: Secret<String>) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.0,
            timeout: Duration::from_secs(60),
            max_retries: 3,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// OpenAI-compatible provider.
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIProvider {
    /// # Errors
    ///
    /// - `InvalidRequest` if the HTTP client can't be built
    pub fn new(config: OpenAIConfig) -> Result<Self, AIError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AIError::InvalidRequest(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn to_wire_request(&self, request: &CompletionRequest, stream: bool) -> WireRequest {
        let system = request
            .system_prompt
            .as_ref()
            .map(|prompt| WireMessage::new("system", prompt));
        let messages = system
            .into_iter()
            .chain(request.messages.iter().map(|msg| {
                let role = match msg.role {
                    MessageRole::System => "system",
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                };
                WireMessage::new(role, &msg.content)
            }))
            .collect();

        WireRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: Some(request.temperature.unwrap_or(self.config.temperature)),
            stream,
            stream_options: stream.then_some(StreamOptions {
                include_usage: true,
            }),
        }
    }

    async fn send(&self, request: &CompletionRequest, stream: bool) -> Result<Response, AIError> {
        debug!(purpose = request.purpose, model = %self.config.model, stream, "sending completion request");
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(self.config.api_key())
            .json(&self.to_wire_request(request, stream))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AIError::Timeout {
                        timeout_secs: self.config.timeout.as_secs() as u32,
                    }
                } else if e.is_connect() {
                    AIError::network(format!("Connection failed: {}", e))
                } else {
                    AIError::network(e.to_string())
                }
            })?;
        check_status(response).await
    }

    async fn complete_once(&self, request: &CompletionRequest) -> Result<CompletionResponse, AIError> {
        let response = self.send(request, false).await?;
        let body: WireResponse = response
            .json()
            .await
            .map_err(|e| AIError::parse(format!("Failed to parse response: {}", e)))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AIError::parse("No choices in response"))?;

        Ok(CompletionResponse {
            content: choice.message.content,
            usage: body
                .usage
                .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
                .unwrap_or_default(),
            model: body.model,
            finish_reason: choice
                .finish_reason
                .as_deref()
                .map(FinishReason::from_wire)
                .unwrap_or(FinishReason::Stop),
        })
    }

    /// Retries transient failures with exponential backoff: 1s, 2s, 4s, ...
    async fn with_retries<T, F, Fut>(&self, purpose: &str, mut attempt: F) -> Result<T, AIError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, AIError>>,
    {
        let mut retry_count = 0;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && retry_count < self.config.max_retries => {
                    let delay = match &err {
                        AIError::RateLimited { retry_after_secs } => {
                            Duration::from_secs(u64::from(*retry_after_secs))
                        }
                        _ => backoff(retry_count),
                    };
                    warn!(purpose, error = %err, retry = retry_count + 1, "retrying completion");
                    sleep(delay).await;
                    retry_count += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Exponential backoff, doubling up to 2^10 seconds.
fn backoff(retry: u32) -> Duration {
    Duration::from_secs(1u64 << retry.min(10))
}

#[async_trait]
impl AIProvider for OpenAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        self.with_retries(request.purpose, || self.complete_once(&request))
            .await
    }

    async fn stream_complete(&self, request: CompletionRequest) -> Result<CompletionStream, AIError> {
        let response = self
            .with_retries(request.purpose, || self.send(&request, true))
            .await?;

        let lines = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| AIError::network(format!("Stream error: {}", e))))
            .scan(SseBuffer::default(), |buffer, chunk| {
                let items = match chunk {
                    Ok(bytes) => buffer.push(&bytes),
                    Err(e) => vec![Err(e)],
                };
                futures::future::ready(Some(items))
            })
            .flat_map(stream::iter);

        Ok(Box::pin(lines))
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new("openai-compatible", &self.config.model)
    }
}

/// Maps non-success statuses to provider errors.
async fn check_status(response: Response) -> Result<Response, AIError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match status.as_u16() {
        401 | 403 => Err(AIError::AuthenticationFailed),
        429 => Err(AIError::rate_limited(parse_retry_after(&body))),
        400 | 422 => Err(AIError::InvalidRequest(body)),
        500..=599 => Err(AIError::unavailable(format!("Server error {}: {}", status, body))),
        _ => Err(AIError::network(format!("Unexpected status {}: {}", status, body))),
    }
}

/// Extracts "try again in Ns" from an error body. Defaults to 30 seconds.
fn parse_retry_after(body: &str) -> u32 {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message")?.as_str().map(str::to_string))
        .and_then(|msg| {
            let rest = &msg[msg.find("try again in ")? + 13..];
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        })
        .unwrap_or(30)
}

/// Accumulates raw bytes and yields parsed chunks for every complete line.
///
/// Lines are decoded only once complete, so a multi-byte character split
/// across two reads is reassembled.
#[derive(Debug, Default)]
struct SseBuffer {
    pending: Vec<u8>,
}

impl SseBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<Result<StreamChunk, AIError>> {
        self.pending.extend_from_slice(bytes);
        let mut results = Vec::new();
        while let Some(newline) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            match std::str::from_utf8(&line) {
                Ok(line) => results.extend(parse_sse_line(line.trim_end())),
                Err(e) => results.push(Err(AIError::parse(format!(
                    "SSE line is not valid UTF-8: {}",
                    e
                )))),
            }
        }
        results
    }
}

/// Parses one SSE line. Comments, blank lines and `[DONE]` yield nothing.
fn parse_sse_line(line: &str) -> Vec<Result<StreamChunk, AIError>> {
    let Some(data) = line.strip_prefix("data:").map(str::trim) else {
        return Vec::new();
    };
    if data.is_empty() || data == "[DONE]" {
        return Vec::new();
    }

    let chunk = match serde_json::from_str::<WireStreamChunk>(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            return vec![Err(AIError::parse(format!(
                "Failed to parse SSE chunk: {}",
                e
            )))]
        }
    };

    let mut results = Vec::new();
    let usage = chunk
        .usage
        .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens));
    match chunk.choices.first() {
        Some(choice) => {
            if let Some(content) = choice.delta.content.as_deref().filter(|c| !c.is_empty()) {
                results.push(Ok(StreamChunk::content(content)));
            }
            if let Some(reason) = &choice.finish_reason {
                results.push(Ok(StreamChunk::final_chunk(
                    FinishReason::from_wire(reason),
                    usage,
                )));
            }
        }
        // Usage-only trailer sent when include_usage is set.
        None if usage.is_some() => {
            results.push(Ok(StreamChunk::final_chunk(FinishReason::Stop, usage)));
        }
        None => {}
    }
    results
}

// ----- Wire types -----

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

impl WireMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    model: String,
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct WireStreamChunk {
    #[serde(default)]
    choices: Vec<WireStreamChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireStreamChoice {
    delta: WireDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireDelta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Message;

    #[test]
    fn config_builder_works() {
        let config = OpenAIConfig::new("test-key")
            .with_model("deepseek-reasoner")
            .with_base_url("https://custom.api.com/v1/")
            .with_temperature(0.3)
            .with_timeout(Duration::from_secs(30))
            .with_max_retries(5);

        assert_eq!(config.model, "deepseek-reasoner");
        assert_eq!(config.base_url, "https://custom.api.com/v1");
        assert_eq!(config.temperature, 0.3);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.api_key(), "test-key");
    }

    #[test]
    fn backoff_doubles_then_levels_off() {
        assert_eq!(backoff(0), Duration::from_secs(1));
        assert_eq!(backoff(3), Duration::from_secs(8));
        assert_eq!(backoff(10), Duration::from_secs(1024));
        assert_eq!(backoff(64), Duration::from_secs(1024));
    }

    #[test]
    fn defaults_target_deepseek() {
        let config = OpenAIConfig::new("k");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn wire_request_puts_system_prompt_first_and_defaults_temperature() {
        let provider = OpenAIProvider::new(OpenAIConfig::new("k").with_temperature(0.2)).unwrap();
        let mut request = CompletionRequest::new("test").with_system_prompt("rules");
        request.messages.push(Message::user("hi"));

        let wire = provider.to_wire_request(&request, true);
        assert_eq!(wire.messages[0].role, "system");
        assert_eq!(wire.messages[1].content, "hi");
        assert_eq!(wire.temperature, Some(0.2));
        assert!(wire.stream_options.is_some());

        let wire = provider.to_wire_request(&request.with_temperature(0.9), false);
        assert_eq!(wire.temperature, Some(0.9));
        assert!(wire.stream_options.is_none());
    }

    #[test]
    fn parse_sse_content_line() {
        let chunks = parse_sse_line(
            r#"data: {"id":"1","choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}"#,
        );
        assert_eq!(chunks.len(), 1);
        let chunk = chunks[0].as_ref().unwrap();
        assert_eq!(chunk.delta, "Hello");
        assert!(!chunk.is_final());
    }

    #[test]
    fn parse_sse_final_line_with_usage() {
        let chunks = parse_sse_line(
            r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}],"usage":{"prompt_tokens":10,"completion_tokens":5}}"#,
        );
        let chunk = chunks[0].as_ref().unwrap();
        assert!(chunk.is_final());
        assert_eq!(chunk.usage, Some(TokenUsage::new(10, 5)));
    }

    #[test]
    fn parse_sse_ignores_done_and_comments() {
        assert!(parse_sse_line("data: [DONE]").is_empty());
        assert!(parse_sse_line(": keep-alive").is_empty());
        assert!(parse_sse_line("").is_empty());
    }

    #[test]
    fn parse_sse_rejects_garbage() {
        let chunks = parse_sse_line("data: {not json");
        assert!(matches!(chunks[0], Err(AIError::Parse(_))));
    }

    #[test]
    fn buffer_joins_lines_split_across_reads() {
        let mut buffer = SseBuffer::default();
        let first = buffer.push(br#"data: {"choices":[{"delta":{"con"#);
        assert!(first.is_empty());

        let second = buffer.push(b"tent\":\"Hi\"},\"finish_reason\":null}]}\n\n");
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].as_ref().unwrap().delta, "Hi");
    }

    #[test]
    fn buffer_keeps_characters_split_across_reads() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"童年\"},\"finish_reason\":null}]}\n";
        let bytes = line.as_bytes();
        let split = line.find('童').unwrap() + 1;

        let mut buffer = SseBuffer::default();
        assert!(buffer.push(&bytes[..split]).is_empty());
        let chunks = buffer.push(&bytes[split..]);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().delta, "童年");
    }

    #[test]
    fn buffer_reports_invalid_utf8_lines() {
        let mut buffer = SseBuffer::default();
        let chunks = buffer.push(b"data: \xff\xfe\n");
        assert!(matches!(chunks[0], Err(AIError::Parse(_))));
    }

    #[test]
    fn parse_retry_after_from_message() {
        let body = r#"{"error":{"message":"Rate limit exceeded. Please try again in 12 seconds."}}"#;
        assert_eq!(parse_retry_after(body), 12);
        assert_eq!(parse_retry_after(r#"{"error":{"message":"nope"}}"#), 30);
        assert_eq!(parse_retry_after("not json"), 30);
    }
}
