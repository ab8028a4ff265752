//! Memoir Interviewer - conversational interview backend
//!
//! Drives a multi-turn oral-history interview. Each answer is tagged with an
//! emotion label and fact-checked, an LLM decides the next question, and once
//! the interview is complete a memoir draft is written. Sessions, turns and
//! flagged snippets are stored relationally.
//!
//! Layout follows ports and adapters:
//!
//! - `domain` - sessions, turns, the turn pipeline's snapshot/events/stages
//! - `ports` - repository, reader, capability and AI provider traits
//! - `application` - history builder, turn orchestrator, reconciler, service
//! - `adapters` - PostgreSQL, in-memory, LLM, HTTP/SSE and console
//! - `config` - environment-driven configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
