//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use clipforge_models::ClipId;
use clipforge_store::StoreError;
use clipforge_worker::WorkerError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Approved clips are not rendered yet")]
    NotReady { clips: Vec<ClipId> },

    #[error("{0}")]
    EmptyInput(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Render service error: {0}")]
    ExternalFailure(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidTransition(_) | ApiError::InvalidState(_) | ApiError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            ApiError::NotReady { .. } | ApiError::EmptyInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ExternalFailure(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error kind name.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::InvalidTransition(_) => "invalid_transition",
            ApiError::InvalidState(_) => "invalid_state",
            ApiError::Conflict(_) => "conflict",
            ApiError::NotReady { .. } => "not_ready",
            ApiError::EmptyInput(_) => "empty_input",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::RateLimited => "rate_limited",
            ApiError::ExternalFailure(_) => "external_failure",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ProjectNotFound(_) | StoreError::ClipNotFound { .. } => {
                ApiError::NotFound(err.to_string())
            }
            StoreError::InvalidTransition { .. } => ApiError::InvalidTransition(err.to_string()),
            StoreError::InvalidState(msg) => ApiError::InvalidState(msg),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::NotReady { clips } => ApiError::NotReady { clips },
            StoreError::EmptyInput(msg) => ApiError::EmptyInput(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<WorkerError> for ApiError {
    fn from(err: WorkerError) -> Self {
        match err {
            WorkerError::Store(e) => e.into(),
            WorkerError::Media(e) => ApiError::ExternalFailure(e.to_string()),
            WorkerError::JobNotFound(job_id) => ApiError::NotFound(format!("job {job_id}")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    clips: Option<Vec<ClipId>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = match &self {
            ApiError::Internal(_) | ApiError::ExternalFailure(_) => {
                tracing::error!(error = %self, "Request failed");
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        let code = self.code();
        let clips = match self {
            ApiError::NotReady { clips } => Some(clips),
            _ => None,
        };

        (status, Json(ErrorResponse { detail, code, clips })).into_response()
    }
}
