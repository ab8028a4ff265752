//! Progress events emitted while a turn is processed.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::TurnSnapshot;

/// Kind tag of a progress event, serialized as the wire `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Intermediate notice forwarded from the dialogue advisor.
    Status,
    /// Streamed text fragment forwarded from the dialogue advisor.
    Content,
    Emotion,
    Dubious,
    Process,
    IsFinished,
    Aim,
    Question,
    Draft,
    /// Successful end of the turn. Carries the complete snapshot.
    Final,
    /// Failed end of the turn.
    Error,
}

impl EventKind {
    /// Final and Error end the stream; nothing follows them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::Final | EventKind::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Status => "status",
            EventKind::Content => "content",
            EventKind::Emotion => "emotion",
            EventKind::Dubious => "dubious",
            EventKind::Process => "process",
            EventKind::IsFinished => "is_finished",
            EventKind::Aim => "aim",
            EventKind::Question => "question",
            EventKind::Draft => "draft",
            EventKind::Final => "final",
            EventKind::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in the live progress feed.
///
/// Serializes as `{"type": ..., "content": ..., "data": {snapshot}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(rename = "content")]
    pub message: String,
    #[serde(rename = "data")]
    pub snapshot: TurnSnapshot,
}

impl ProgressEvent {
    pub fn new(kind: EventKind, message: impl Into<String>, snapshot: &TurnSnapshot) -> Self {
        Self {
            kind,
            message: message.into(),
            snapshot: snapshot.clone(),
        }
    }

    pub fn completed(snapshot: &TurnSnapshot) -> Self {
        Self::new(EventKind::Final, "Turn processed", snapshot)
    }

    pub fn failed(message: impl Into<String>, snapshot: &TurnSnapshot) -> Self {
        Self::new(EventKind::Error, message, snapshot)
    }

    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }

    /// Serializes to the JSON wire shape.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"type":"error","content":"failed to encode {} event","data":{{}}}}"#,
                self.kind
            )
        })
    }
}
