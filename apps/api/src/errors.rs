use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::analysis::history::StoreError;
use crate::auth::provider::IdentityError;
use crate::engine::EngineError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("No resume file uploaded")]
    NoFileUploaded,

    #[error("Job description is empty")]
    NoJobDescription,

    #[error("Uploaded file exceeds the 10 MiB limit")]
    FileTooLarge,

    #[error("Upload rejected: {0}")]
    Upload(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Analysis engine error (status {status}): {detail}")]
    Upstream {
        status: u16,
        detail: String,
        body: Option<Value>,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Status {
                status,
                detail,
                body,
            } => AppError::Upstream {
                status,
                detail,
                body,
            },
            other => AppError::Upstream {
                status: 500,
                detail: other.to_string(),
                body: None,
            },
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected { message, .. } => AppError::AuthFailed(message),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            AppError::NoFileUploaded => (
                StatusCode::BAD_REQUEST,
                "NO_FILE_UPLOADED".to_string(),
                "Resume file is required".to_string(),
                None,
            ),
            AppError::NoJobDescription => (
                StatusCode::BAD_REQUEST,
                "NO_JOB_DESCRIPTION".to_string(),
                "Job description is required".to_string(),
                None,
            ),
            AppError::FileTooLarge => (
                StatusCode::BAD_REQUEST,
                "FILE_TOO_LARGE".to_string(),
                "File size too large. Maximum size is 10MB.".to_string(),
                None,
            ),
            AppError::Upload(msg) => (
                StatusCode::BAD_REQUEST,
                "UPLOAD_ERROR".to_string(),
                msg,
                None,
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR".to_string(),
                msg,
                None,
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED".to_string(),
                "No authorization token provided".to_string(),
                None,
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN".to_string(),
                "Invalid or expired token".to_string(),
                None,
            ),
            AppError::AuthFailed(msg) => (
                StatusCode::UNAUTHORIZED,
                "AUTH_FAILED".to_string(),
                msg,
                None,
            ),
            AppError::Upstream {
                status,
                detail,
                body,
            } => {
                tracing::error!(status, "Analysis engine error: {detail}");
                (
                    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                    detail,
                    "AI service error".to_string(),
                    Some(body.unwrap_or(Value::Null)),
                )
            }
            AppError::Store(StoreError::NotFound) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND".to_string(),
                "Analysis not found".to_string(),
                None,
            ),
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR".to_string(),
                    "A storage error occurred".to_string(),
                    None,
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR".to_string(),
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        };

        error_response(status, &code, &message, details)
    }
}

/// Builds the `{success: false, message, error}` envelope shared by every failure path.
pub fn error_response(
    status: StatusCode,
    code: &str,
    message: &str,
    details: Option<Value>,
) -> Response {
    let mut body = json!({
        "success": false,
        "message": message,
        "error": code,
    });
    if let Some(details) = details {
        body["details"] = details;
    }
    (status, Json(body)).into_response()
}
