// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hirelane_core::TransitionError;
use hirelane_db::DbError;
use serde::Serialize;
use thiserror::Error;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown and deleted session ids are deliberately indistinguishable.
    #[error("Session not found")]
    SessionNotFound,

    #[error("Turn not found")]
    TurnNotFound,

    #[error("Candidate not found: {0}")]
    CandidateNotFound(i64),

    #[error("Template not found: {0}")]
    TemplateNotFound(i64),

    #[error("Invalid transition: {0}")]
    InvalidTransition(TransitionError),

    #[error("Illegal state: {0}")]
    IllegalState(TransitionError),

    #[error("Turn does not belong to session")]
    TurnMismatch,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(DbError),
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::SessionNotFound => ApiError::SessionNotFound,
            DbError::TurnNotFound => ApiError::TurnNotFound,
            DbError::TurnMismatch => ApiError::TurnMismatch,
            DbError::Transition(t) => ApiError::from(t),
            other => ApiError::Database(other),
        }
    }
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::Invalid { .. } => ApiError::InvalidTransition(err),
            TransitionError::Precondition { .. } => ApiError::IllegalState(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::SessionNotFound => {
                tracing::warn!("Session not found");
                (StatusCode::NOT_FOUND, ErrorResponse::new("Session not found"))
            }
            ApiError::TurnNotFound => {
                tracing::warn!("Turn not found");
                (StatusCode::NOT_FOUND, ErrorResponse::new("Turn not found"))
            }
            ApiError::CandidateNotFound(id) => {
                tracing::warn!(candidate_id = %id, "Candidate not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Candidate not found", format!("Candidate ID: {id}")),
                )
            }
            ApiError::TemplateNotFound(id) => {
                tracing::warn!(template_id = %id, "Template not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Template not found", format!("Template ID: {id}")),
                )
            }
            ApiError::InvalidTransition(err) => {
                tracing::warn!(error = %err, "Invalid status transition");
                (
                    StatusCode::CONFLICT,
                    ErrorResponse::with_details("Invalid transition", err.to_string()),
                )
            }
            ApiError::IllegalState(err) => {
                tracing::warn!(error = %err, "Illegal session state for request");
                (
                    StatusCode::CONFLICT,
                    ErrorResponse::with_details("Illegal state", err.to_string()),
                )
            }
            ApiError::TurnMismatch => {
                tracing::warn!("Turn does not belong to session");
                (
                    StatusCode::CONFLICT,
                    ErrorResponse::new("Turn does not belong to session"),
                )
            }
            ApiError::Validation(msg) => {
                tracing::warn!(message = %msg, "Validation error");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Validation error", msg.clone()),
                )
            }
            ApiError::Database(db_err) => {
                tracing::error!(error = %db_err, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details("Database error", db_err.to_string()),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
