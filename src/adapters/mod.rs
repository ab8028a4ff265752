//! Adapters - Implementations of port interfaces.
//!
//! - `ai` - OpenAI-compatible chat client and a mock provider
//! - `capabilities` - LLM-backed and scripted capability implementations
//! - `memory` - in-memory interview store
//! - `postgres` - PostgreSQL interview store
//! - `http` - axum routes with server-sent event streams
//! - `cli` - interactive console

pub mod ai;
pub mod capabilities;
pub mod cli;
pub mod http;
pub mod memory;
pub mod postgres;

pub use ai::{MockAIProvider, OpenAIConfig, OpenAIProvider};
pub use capabilities::llm_capabilities;
pub use memory::InMemoryInterviewStore;
pub use postgres::{PostgresInterviewReader, PostgresInterviewRepository};
