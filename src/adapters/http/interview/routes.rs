//! HTTP routes for the interview endpoints.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::timeout::TimeoutLayer;

use super::handlers::{
    continue_interview, list_dialogues, start_interview, InterviewHandlers,
};

/// Creates the `/api` router.
///
/// `request_timeout` bounds the JSON listing only. Turn streams stay open
/// until their terminal event.
pub fn interview_routes(handlers: InterviewHandlers, request_timeout: Duration) -> Router {
    Router::new()
        .route(
            "/dialogues",
            get(list_dialogues).layer(TimeoutLayer::new(request_timeout)),
        )
        .route("/start", post(start_interview))
        .route("/continue", post(continue_interview))
        .with_state(handlers)
}
