//! AI Provider Adapters.
//!
//! - `OpenAIProvider` - any OpenAI-compatible chat endpoint (DeepSeek by default)
//! - `MockAIProvider` - queued responses for tests

mod mock_provider;
mod openai_provider;

pub use mock_provider::{MockAIProvider, MockResponse};
pub use openai_provider::{OpenAIConfig, OpenAIProvider, DEFAULT_BASE_URL, DEFAULT_MODEL};
