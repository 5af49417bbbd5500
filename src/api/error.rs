//! Mapping of [`ServiceError`] onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::error::ServiceError;

/// Error returned by route handlers.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self(e)
    }
}

impl ApiError {
    /// Status code and client-facing message. Only validation and not-found
    /// messages are passed through.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match &self.0 {
            ServiceError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServiceError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            e if e.is_upstream() => (StatusCode::SERVICE_UNAVAILABLE, "service busy".into()),
            ServiceError::Graph(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "graph query failed".into(),
            ),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(status = status.as_u16(), "Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
