//! Interview domain module.
//!
//! Sessions, their question/answer turns and the snippets flagged as
//! dubious, plus the text rendering of a session's history that the
//! dialogue capabilities consume.

mod errors;
mod flagged_snippet;
mod history;
mod session;
mod turn;

pub use errors::TurnError;
pub use flagged_snippet::FlaggedSnippet;
pub use history::{render_transcript, InterviewContext, DEFAULT_EMOTION};
pub use session::Session;
pub use turn::{Turn, MAX_AIM_LENGTH, MAX_EMOTION_LENGTH};
