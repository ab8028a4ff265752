//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machine)
//! - `interview` - Sessions, turns, flagged snippets and history rendering
//! - `pipeline` - Turn stages, the cumulative snapshot and progress events

pub mod foundation;
pub mod interview;
pub mod pipeline;
