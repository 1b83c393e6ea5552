use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use validator::ValidationErrors;

use crate::{envelope::Enveloped, repository::RepositoryError, storage::StorageError};

/// ApiError
///
/// Every failure a service or handler can surface. Client-facing variants carry their message
/// into the envelope; store and upload faults are logged and replaced with a generic message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("You do not have permission to modify this {0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("image upload failed: {0}")]
    Upload(#[from] StorageError),

    #[error("repository failure: {0}")]
    Repository(#[from] RepositoryError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthorized(_) | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Upload(_) | ApiError::Repository(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Upload(e) => {
                tracing::error!(error = %e, "image upload failed");
                "Image upload failed".to_string()
            }
            ApiError::Repository(e) => {
                tracing::error!(error = %e, "repository failure");
                "Internal Server Error".to_string()
            }
            ApiError::Internal(e) => {
                tracing::error!(error = %e, "internal failure");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };
        Enveloped::error(status, message).into_response()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

// Extractor rejections are rendered through the envelope instead of axum's plain-text bodies.

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        ApiError::Validation(error.body_text())
    }
}
