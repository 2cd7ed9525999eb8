//! Interview lifecycle endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::interview::{Delivery, DropReason, InterviewController, Phase, WarningTally};

/// Build interview router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/initialize", post(initialize))
        .route("/reset", post(reset))
        .route("/start-interview", post(start_interview))
        .route("/end-interview", post(end_interview))
        .route("/answer", post(answer))
        .with_state(state)
}

/// Reply to a lifecycle action
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
    pub error: Option<String>,
}

impl ActionResponse {
    fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            error: None,
        })
    }
}

/// Current interview status
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub initialized: bool,
    pub interview_active: bool,
    pub monitoring_active: bool,
    pub waiting_for_response: bool,
    pub phase: Phase,
    pub question_count: usize,
    pub max_questions: usize,
    pub warnings: WarningTally,
}

async fn status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    let status = state.controller.status();
    Json(StatusResponse {
        initialized: status.initialized,
        interview_active: status.session.active,
        monitoring_active: status.session.monitoring_active,
        waiting_for_response: status.session.waiting_for_response,
        phase: status.session.phase,
        question_count: status.session.turn_index,
        max_questions: status.session.max_turns,
        warnings: status.session.warnings,
    })
}

async fn initialize(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ActionResponse>, InterviewError> {
    blocking(&state, |controller| {
        controller.initialize();
        Ok(())
    })
    .await?;
    Ok(ActionResponse::ok("Interview bot initialized"))
}

async fn reset(State(state): State<Arc<ApiState>>) -> Result<Json<ActionResponse>, InterviewError> {
    blocking(&state, |controller| {
        controller.reset();
        Ok(())
    })
    .await?;
    Ok(ActionResponse::ok("Interview state reset"))
}

async fn start_interview(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ActionResponse>, InterviewError> {
    blocking(&state, InterviewController::start).await?;
    Ok(ActionResponse::ok("Interview started"))
}

async fn end_interview(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ActionResponse>, InterviewError> {
    blocking(&state, |controller| {
        controller.end();
        Ok(())
    })
    .await?;
    Ok(ActionResponse::ok("Interview ended successfully"))
}

/// Answer submission request
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub message: String,
}

async fn answer(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<ActionResponse>, InterviewError> {
    match state.controller.submit_answer(&request.message)? {
        Delivery::Delivered => Ok(ActionResponse::ok("Response received and processed")),
        Delivery::Dropped(DropReason::Empty) => {
            Err(InterviewError::BadRequest("Empty message received"))
        }
        Delivery::Dropped(DropReason::NotAwaiting) => Err(InterviewError::NotWaiting),
    }
}

/// Run a lifecycle call off the async runtime
async fn blocking<F>(state: &ApiState, call: F) -> Result<(), InterviewError>
where
    F: FnOnce(&InterviewController) -> crate::Result<()> + Send + 'static,
{
    let controller = Arc::clone(&state.controller);
    tokio::task::spawn_blocking(move || call(&controller))
        .await
        .map_err(|e| InterviewError::Internal(e.to_string()))?
        .map_err(InterviewError::from)
}

/// Interview API errors
#[derive(Debug)]
pub enum InterviewError {
    NotInitialized,
    AlreadyActive,
    NotWaiting,
    BadRequest(&'static str),
    Unavailable(String),
    Internal(String),
}

impl From<crate::Error> for InterviewError {
    fn from(error: crate::Error) -> Self {
        match error {
            crate::Error::NotInitialized => Self::NotInitialized,
            crate::Error::AlreadyActive => Self::AlreadyActive,
            crate::Error::Worker(msg) => Self::Unavailable(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for InterviewError {
    fn into_response(self) -> Response {
        let (status, message, error) = match self {
            Self::NotInitialized => (
                StatusCode::BAD_REQUEST,
                "Interview bot is not initialized".to_string(),
                "not_initialized".to_string(),
            ),
            Self::AlreadyActive => (
                StatusCode::CONFLICT,
                "Interview already in progress".to_string(),
                "already_active".to_string(),
            ),
            Self::NotWaiting => (
                StatusCode::CONFLICT,
                "No question is waiting for an answer".to_string(),
                "not_waiting".to_string(),
            ),
            Self::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                msg.to_string(),
                "bad_request".to_string(),
            ),
            Self::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone(), msg),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "interview request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), msg)
            }
        };

        (
            status,
            Json(ActionResponse {
                success: false,
                message,
                error: Some(error),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_errors_map_to_variants() {
        assert!(matches!(
            InterviewError::from(crate::Error::AlreadyActive),
            InterviewError::AlreadyActive
        ));
        assert!(matches!(
            InterviewError::from(crate::Error::NotInitialized),
            InterviewError::NotInitialized
        ));
        assert!(matches!(
            InterviewError::from(crate::Error::Audio("x".to_string())),
            InterviewError::Internal(_)
        ));
    }

    #[test]
    fn conflict_status_for_running_interview() {
        let response = InterviewError::AlreadyActive.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
