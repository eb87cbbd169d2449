//! API error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::CoreError;
use crate::fetch::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    NotReady,
    InvalidParameter,
    NotFound,
    UpstreamError,
    Internal,
}

impl ApiErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            Self::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvalidParameter => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UpstreamError => StatusCode::BAD_GATEWAY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::InvalidParameter, message)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::NotInitialized { .. } => ApiErrorCode::NotReady,
            CoreError::InvalidKey { .. } => ApiErrorCode::InvalidParameter,
            CoreError::Fetch(FetchError::Status { status: 404, .. }) => ApiErrorCode::NotFound,
            CoreError::Fetch(_) | CoreError::Parse { .. } => ApiErrorCode::UpstreamError,
            CoreError::Task { .. } => ApiErrorCode::Internal,
        };
        match code {
            ApiErrorCode::UpstreamError => warn!(error = %err, "upstream failure"),
            ApiErrorCode::Internal => error!(error = %err, "internal failure"),
            _ => debug!(error = %err, ?code, "request rejected"),
        }
        Self::new(code, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}
