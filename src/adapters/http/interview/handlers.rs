//! HTTP handlers for the interview endpoints.

use std::convert::Infallible;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::StreamExt;
use tracing::{error, warn};

use crate::application::handlers::{InterviewService, InterviewStream};
use crate::domain::interview::TurnError;

use super::dto::{
    ContinueInterviewRequest, DialogueListResponse, ErrorResponse, HealthResponse,
    StartInterviewRequest,
};

/// Carries the session id on streaming responses.
pub const SESSION_ID_HEADER: HeaderName = HeaderName::from_static("x-session-id");

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct InterviewHandlers {
    service: InterviewService,
}

impl InterviewHandlers {
    pub fn new(service: InterviewService) -> Self {
        Self { service }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// GET /health - Liveness check
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// GET /api/dialogues - All sessions with their turns and flagged snippets
pub async fn list_dialogues(State(handlers): State<InterviewHandlers>) -> Response {
    match handlers.service.list_sessions().await {
        Ok(sessions) => {
            (StatusCode::OK, Json(DialogueListResponse::from(sessions))).into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to list dialogues");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal("Failed to load dialogues")),
            )
                .into_response()
        }
    }
}

/// POST /api/start - Create a session and stream the first turn
pub async fn start_interview(
    State(handlers): State<InterviewHandlers>,
    body: Result<Json<StartInterviewRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = body else {
        return bad_request("Request body must be JSON with an input field");
    };
    let Some(input) = req.input else {
        return bad_request("Missing input");
    };

    match handlers.service.start_interview(&input).await {
        Ok(stream) => sse_response(stream),
        Err(e) => handle_turn_error(e),
    }
}

/// POST /api/continue - Stream the next turn of an existing session
pub async fn continue_interview(
    State(handlers): State<InterviewHandlers>,
    body: Result<Json<ContinueInterviewRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = body else {
        return bad_request("Request body must be JSON with session_id and input fields");
    };
    let session_id = match req.parsed_session_id() {
        Ok(id) => id,
        Err(reason) => return bad_request(reason),
    };
    let Some(input) = req.input else {
        return bad_request("Missing input");
    };

    match handlers.service.continue_interview(session_id, &input).await {
        Ok(stream) => sse_response(stream),
        Err(e) => handle_turn_error(e),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════════════

/// Streams each progress event as one `data:` line of JSON.
fn sse_response(stream: InterviewStream) -> Response {
    let session_id = stream.session_id;
    let events = stream
        .into_stream()
        .map(|event| Ok::<_, Infallible>(Event::default().data(event.to_json())));

    let mut response = Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&session_id.to_string()) {
        response.headers_mut().insert(SESSION_ID_HEADER, value);
    }
    response
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::bad_request(message)),
    )
        .into_response()
}

fn handle_turn_error(error: TurnError) -> Response {
    match error {
        TurnError::Validation(e) => bad_request(e.to_string()),
        TurnError::Consistency(e) => {
            warn!(error = %e, "interview request rejected");
            (
                StatusCode::CONFLICT,
                Json(ErrorResponse::new(e.code.to_string(), e.message)),
            )
                .into_response()
        }
        other => {
            error!(error = %other, kind = other.kind(), "failed to open interview stream");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal(other.to_string())),
            )
                .into_response()
        }
    }
}
