//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Capability Ports
//!
//! - `EmotionClassifier`, `FactChecker`, `DialogueAdvisor`, `Summarizer` -
//!   the external services a turn is processed with
//! - `AIProvider` - chat-completion backend used by the LLM adapters
//!
//! ## Persistence Ports
//!
//! - `InterviewRepository` - sessions, turns and the atomic turn commit
//! - `InterviewReader` - denormalized session views for listing

mod ai_provider;
mod capabilities;
mod interview_reader;
mod interview_repository;

pub use ai_provider::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, CompletionStream, FinishReason,
    Message, MessageRole, ProviderInfo, StreamChunk, TokenUsage,
};
pub use capabilities::{
    AdvisorStream, AdvisorUpdate, AdvisorVerdict, CapabilityError, DialogueAdvisor,
    EmotionClassifier, FactChecker, Summarizer,
};
pub use interview_reader::{InterviewReader, SessionView, SnippetView, TurnView};
pub use interview_repository::{FollowUp, InterviewRepository, TurnCommit};
