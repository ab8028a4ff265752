//! HTTP adapter for the interview endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::{
    ContinueInterviewRequest, DialogueListResponse, ErrorResponse, HealthResponse,
    StartInterviewRequest,
};
pub use handlers::{health, InterviewHandlers, SESSION_ID_HEADER};
pub use routes::interview_routes;
