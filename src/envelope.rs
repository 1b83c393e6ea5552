use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// ResponseStatus
///
/// Envelope-level outcome code. Serialized as a two-digit string so clients can switch on it
/// without parsing the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ResponseStatus {
    #[serde(rename = "01")]
    Success,
    #[serde(rename = "02")]
    Failure,
    #[serde(rename = "03")]
    Unauthorized,
    #[serde(rename = "04")]
    NotFound,
    #[serde(rename = "05")]
    Forbidden,
    #[serde(rename = "06")]
    InternalError,
    #[serde(rename = "07")]
    BadRequest,
}

impl ResponseStatus {
    /// Maps an HTTP status onto the envelope code carried in the body.
    pub fn from_http(status: StatusCode) -> Self {
        match status {
            s if s.is_success() => Self::Success,
            StatusCode::BAD_REQUEST | StatusCode::PAYLOAD_TOO_LARGE => Self::BadRequest,
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::FORBIDDEN => Self::Forbidden,
            StatusCode::NOT_FOUND => Self::NotFound,
            s if s.is_server_error() => Self::InternalError,
            _ => Self::Failure,
        }
    }
}

/// ApiResponse
///
/// The uniform body of every response this service produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status_code: ResponseStatus,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: ResponseStatus::Success,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failure(status_code: ResponseStatus, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            data: None,
        }
    }
}

/// Enveloped
///
/// An HTTP status paired with its envelope. Handlers return this (or an `ApiError`, which renders
/// through the same type), so a body is wrapped exactly once on its way out.
#[derive(Debug)]
pub struct Enveloped<T> {
    pub status: StatusCode,
    pub body: ApiResponse<T>,
}

impl<T> Enveloped<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: ApiResponse::success(data, message),
        }
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CREATED,
            body: ApiResponse::success(data, message),
        }
    }
}

impl Enveloped<()> {
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiResponse::failure(ResponseStatus::from_http(status), message),
        }
    }
}

impl<T: Serialize> IntoResponse for Enveloped<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
