//! Ink-wash background generation.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, warn};

use crate::api::error::ApiResult;
use crate::api::server::AppState;
use crate::error::ServiceError;
use crate::ink::InkOutcome;

/// Extract the `content` string from a JSON body. Empty strings are kept.
fn content_from_body(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value.get("content")?.as_str().map(str::to_string)
}

/// POST /generate_ink: `{"content": "..."}` to a cached background URL.
///
/// The body is read raw so that malformed JSON gets the same 400 as a
/// missing field.
pub async fn generate_ink(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Response> {
    let body = match body {
        Ok(body) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!("Ink request body over the configured limit");
            return Ok((
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({ "error": "content too large" })),
            )
                .into_response());
        }
        Err(_) => return Err(ServiceError::Validation("missing content".into()).into()),
    };
    let content = content_from_body(&body)
        .ok_or_else(|| ServiceError::Validation("missing content".into()))?;

    // Detached so a client disconnect does not abort a generation in progress.
    let ink = Arc::clone(&state.ink);
    let outcome = tokio::spawn(async move { ink.get_or_create_background(&content).await })
        .await
        .unwrap_or_else(|e| {
            error!("Ink background task failed: {e}");
            InkOutcome::Fallback {
                url: state.ink.fallback_url().to_string(),
            }
        });

    match outcome {
        InkOutcome::Fallback { url } => {
            warn!("Serving fallback ink background");
            Ok((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "service busy", "fallback": url })),
            )
                .into_response())
        }
        outcome => Ok(Json(json!({ "url": outcome.url() })).into_response()),
    }
}
