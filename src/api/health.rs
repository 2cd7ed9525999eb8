//! Health check endpoint

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use super::ApiState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub interview_active: bool,
    pub waiting_for_response: bool,
    pub clients: usize,
}

/// Liveness probe with a glance at the interview
async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let session = state.controller.session();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        interview_active: session.is_active(),
        waiting_for_response: session.gate().is_awaiting(),
        clients: state.hub.receiver_count(),
    })
}

/// Build health router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state)
}
