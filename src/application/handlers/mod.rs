//! Application handlers.
//!
//! The turn pipeline and the service that drives it for callers.

pub mod history_builder;
pub mod interview_service;
pub mod reconciler;
pub mod session_locks;
pub mod turn_orchestrator;

pub use history_builder::SessionHistoryBuilder;
pub use interview_service::{InterviewService, InterviewSettings, InterviewStream};
pub use reconciler::{CommitOutcome, CommitTurnCommand, PersistenceReconciler};
pub use session_locks::{SessionGuard, SessionLocks};
pub use turn_orchestrator::{Capabilities, OrchestratorConfig, TurnOrchestrator};
