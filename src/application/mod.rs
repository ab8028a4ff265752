//! Application layer - orchestration of domain operations over ports.
//!
//! Handlers here compose the interview domain with the capability and
//! persistence ports. They hold no state of their own besides per-session
//! locks.

pub mod handlers;

pub use handlers::{
    Capabilities, CommitOutcome, CommitTurnCommand, InterviewService, InterviewSettings,
    InterviewStream, OrchestratorConfig, PersistenceReconciler, SessionHistoryBuilder,
    TurnOrchestrator,
};
