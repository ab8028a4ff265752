//! HTTP adapter - JSON and server-sent events over axum.

pub mod interview;

pub use interview::{interview_routes, InterviewHandlers, SESSION_ID_HEADER};

use std::time::Duration;

use axum::{http::HeaderValue, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::application::handlers::InterviewService;

/// Builds the application router.
///
/// An empty `cors_origins` list allows any origin.
pub fn app_router(
    service: InterviewService,
    cors_origins: &[String],
    request_timeout: Duration,
) -> Router {
    Router::new()
        .route("/health", get(interview::health))
        .nest(
            "/api",
            interview_routes(InterviewHandlers::new(service), request_timeout),
        )
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([SESSION_ID_HEADER]);
    if origins.is_empty() {
        return base.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(parsed)
}
