//! Turn pipeline vocabulary.
//!
//! The stage machine the orchestrator walks through, the cumulative
//! snapshot it fills in, and the progress events it emits along the way.

mod event;
mod snapshot;
mod stage;

pub use event::{EventKind, ProgressEvent};
pub use snapshot::TurnSnapshot;
pub use stage::{CapabilityKind, TurnStage};
