use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct ModelAttempt {
    pub model: String,
    pub error: String,
}

impl fmt::Display for ModelAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.model, self.error)
    }
}

fn join_attempts(attempts: &[ModelAttempt]) -> String {
    if attempts.is_empty() {
        return "no models configured".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("{0}")]
    Validation(String),
    #[error("Text recognition failed: {0}")]
    Recognition(String),
    #[error("Reasoning failed: {0}")]
    Reasoning(String),
    #[error("All models failed ({})", join_attempts(.attempts))]
    AllModelsFailed { attempts: Vec<ModelAttempt> },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    Internal(String),
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Validation(message) => ApiError::BadRequest(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                info!("Rejected analysis request: {}", message);
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::PayloadTooLarge(message) => {
                info!("Rejected oversized upload: {}", message);
                (StatusCode::PAYLOAD_TOO_LARGE, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(detail) => {
                error!("Server error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Analysis failed" })),
                )
                    .into_response()
            }
        }
    }
}
