//! Turn processing error taxonomy.

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};
use crate::domain::pipeline::TurnSnapshot;
use crate::ports::CapabilityError;
use thiserror::Error;

/// Why processing or committing a turn failed.
///
/// Each variant maps to exactly one terminal `error` event.
#[derive(Debug, Clone, Error)]
pub enum TurnError {
    /// Blank or missing input.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// An external capability failed, timed out or returned garbage.
    #[error("{0}")]
    Capability(#[from] CapabilityError),

    /// The caller's view of the open turn disagrees with the store.
    #[error("{0}")]
    Consistency(DomainError),

    /// The store rejected the commit. The snapshot is kept so the commit
    /// can be retried without re-running the capabilities.
    #[error("failed to persist turn: {error}")]
    Persistence {
        error: DomainError,
        snapshot: Box<TurnSnapshot>,
    },
}

impl TurnError {
    pub fn consistency(code: ErrorCode, message: impl Into<String>) -> Self {
        TurnError::Consistency(DomainError::new(code, message))
    }

    /// Sorts a store error into consistency or persistence failure.
    pub fn from_store(error: DomainError, snapshot: &TurnSnapshot) -> Self {
        if error.is_consistency_violation() {
            TurnError::Consistency(error)
        } else {
            TurnError::Persistence {
                error,
                snapshot: Box::new(snapshot.clone()),
            }
        }
    }

    /// Snapshot retained by a failed commit, if any.
    pub fn retained_snapshot(&self) -> Option<&TurnSnapshot> {
        match self {
            TurnError::Persistence { snapshot, .. } => Some(snapshot),
            _ => None,
        }
    }

    /// Short machine-readable category, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TurnError::Validation(_) => "validation",
            TurnError::Capability(_) => "capability",
            TurnError::Consistency(_) => "consistency",
            TurnError::Persistence { .. } => "persistence",
        }
    }
}
