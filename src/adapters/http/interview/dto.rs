//! Request/response DTOs for the interview endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::SessionId;
use crate::ports::SessionView;

/// POST /api/start body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartInterviewRequest {
    pub input: Option<String>,
}

/// POST /api/continue body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContinueInterviewRequest {
    pub session_id: Option<String>,
    pub input: Option<String>,
}

impl ContinueInterviewRequest {
    /// Parses the session id, or explains why it can't be used.
    pub fn parsed_session_id(&self) -> Result<SessionId, &'static str> {
        let raw = self
            .session_id
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or("Missing session_id")?;
        raw.parse().map_err(|_| "Invalid session_id")
    }
}

/// GET /api/dialogues response.
#[derive(Debug, Clone, Serialize)]
pub struct DialogueListResponse {
    pub sessions: Vec<SessionView>,
    pub total: usize,
}

impl From<Vec<SessionView>> for DialogueListResponse {
    fn from(sessions: Vec<SessionView>) -> Self {
        Self {
            total: sessions.len(),
            sessions,
        }
    }
}

/// GET /health response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Error body for requests rejected before any stream is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continue_request_parses_session_id() {
        let id = SessionId::new();
        let req = ContinueInterviewRequest {
            session_id: Some(id.to_string()),
            input: Some("hi".into()),
        };
        assert_eq!(req.parsed_session_id(), Ok(id));
    }

    #[test]
    fn continue_request_explains_bad_ids() {
        let missing = ContinueInterviewRequest::default();
        assert_eq!(missing.parsed_session_id(), Err("Missing session_id"));

        let malformed = ContinueInterviewRequest {
            session_id: Some("42".into()),
            input: None,
        };
        assert_eq!(malformed.parsed_session_id(), Err("Invalid session_id"));
    }

    #[test]
    fn error_response_omits_empty_details() {
        let json = serde_json::to_value(ErrorResponse::bad_request("Missing input")).unwrap();
        assert_eq!(json["code"], "BAD_REQUEST");
        assert!(json.get("details").is_none());
    }
}
