//! Integration tests for the interview HTTP endpoints.
//!
//! These drive the full router with `tower::ServiceExt::oneshot`:
//! 1. Request validation maps to 400 before any session is created
//! 2. Turn endpoints answer with an event stream and the session header
//! 3. The dialogue listing reflects committed turns

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use memoir_interviewer::adapters::capabilities::{
    ScriptedDialogueAdvisor, ScriptedEmotionClassifier, ScriptedFactChecker, ScriptedSummarizer,
};
use memoir_interviewer::adapters::http::{app_router, SESSION_ID_HEADER};
use memoir_interviewer::adapters::InMemoryInterviewStore;
use memoir_interviewer::application::handlers::{
    Capabilities, InterviewService, InterviewSettings, TurnOrchestrator,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

fn app(advisor: ScriptedDialogueAdvisor) -> Router {
    let store = Arc::new(InMemoryInterviewStore::new());
    let orchestrator = TurnOrchestrator::new(Capabilities {
        emotion: Arc::new(ScriptedEmotionClassifier::returning("positive")),
        fact_checker: Arc::new(ScriptedFactChecker::returning(vec![
            "won the lottery twice".to_string(),
        ])),
        advisor: Arc::new(advisor),
        summarizer: Arc::new(ScriptedSummarizer::returning("A life by the sea.")),
    });
    let service = InterviewService::new(
        store.clone(),
        store,
        orchestrator,
        InterviewSettings::default(),
    );
    app_router(service, &[], Duration::from_secs(30))
}

fn continuing() -> ScriptedDialogueAdvisor {
    ScriptedDialogueAdvisor::continuing("30%", "Childhood", "Where did you grow up?")
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// Parses every `data:` line of an event-stream body.
fn sse_events(body: &str) -> Vec<Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).unwrap())
        .collect()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_reports_ok() {
    let response = app(continuing()).oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn start_without_input_is_bad_request() {
    let response = app(continuing())
        .oneshot(post("/api/start", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Missing input");
}

#[tokio::test]
async fn start_with_blank_input_is_bad_request() {
    let response = app(continuing())
        .oneshot(post("/api/start", json!({"input": "   "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn start_with_non_json_body_is_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/start")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("input=hello"))
        .unwrap();
    let response = app(continuing()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn continue_with_malformed_session_id_is_bad_request() {
    let response = app(continuing())
        .oneshot(post(
            "/api/continue",
            json!({"session_id": "not-a-uuid", "input": "hello"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Invalid session_id");
}

#[tokio::test]
async fn continue_without_session_id_is_bad_request() {
    let response = app(continuing())
        .oneshot(post("/api/continue", json!({"input": "hello"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Streaming turns
// =============================================================================

#[tokio::test]
async fn start_streams_progress_and_ends_with_final() {
    let response = app(continuing())
        .oneshot(post("/api/start", json!({"input": "Ada, born 1950"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(SESSION_ID_HEADER));
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));

    let events = sse_events(&body_text(response).await);
    let kinds: Vec<&str> = events.iter().filter_map(|e| e["type"].as_str()).collect();
    assert!(kinds.contains(&"emotion"));
    assert!(kinds.contains(&"dubious"));
    assert_eq!(kinds.last(), Some(&"final"));

    let last = events.last().unwrap();
    assert_eq!(last["data"]["emotion"], "positive");
    assert_eq!(last["data"]["question"], "Where did you grow up?");
}

#[tokio::test]
async fn continue_on_unknown_session_streams_a_single_error() {
    let response = app(continuing())
        .oneshot(post(
            "/api/continue",
            json!({"session_id": uuid::Uuid::new_v4().to_string(), "input": "hello"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let events = sse_events(&body_text(response).await);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["type"], "error");
}

#[tokio::test]
async fn finished_interview_is_listed_with_its_draft() {
    let router = app(ScriptedDialogueAdvisor::finishing("100%"));

    let response = router
        .clone()
        .oneshot(post("/api/start", json!({"input": "I won the lottery twice"})))
        .await
        .unwrap();
    let session_id = response.headers()[SESSION_ID_HEADER]
        .to_str()
        .unwrap()
        .to_string();
    let events = sse_events(&body_text(response).await);
    assert_eq!(events.last().unwrap()["data"]["draft"], "A life by the sea.");

    let response = router.oneshot(get("/api/dialogues")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["total"], 1);
    let session = &body["sessions"][0];
    assert_eq!(session["id"], session_id);
    assert_eq!(session["is_finished"], true);
    assert_eq!(session["draft"], "A life by the sea.");
    assert_eq!(session["qas"][0]["answer"], "I won the lottery twice");
    assert_eq!(
        session["qas"][0]["dubious"][0]["snippet"],
        "won the lottery twice"
    );
}
