//! Error types for the shiyun service.
//!
//! Every fallible operation in the library returns [`Result`]. The HTTP layer
//! maps each variant to a fixed status code and a safe message (see
//! `api::error`), so variant payloads are for logs only unless noted.

use thiserror::Error;

/// Errors produced by the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or missing request input. The message is shown to the client.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The requested entity does not exist. The message is shown to the client.
    #[error("not found: {0}")]
    NotFound(String),

    /// The image generation service rejected or failed a request.
    #[error("image generation failed: {0}")]
    Generation(String),

    /// Downloading a generated image failed.
    #[error("image fetch failed: {0}")]
    Fetch(String),

    /// Decoding, filtering, or encoding an image failed.
    #[error("image processing failed: {0}")]
    Image(String),

    /// The graph database returned an error or an unreadable response.
    #[error("graph query failed: {0}")]
    Graph(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Anything else, e.g. a panicked blocking task.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// True for failures of the external generation pipeline. These are
    /// never shown to clients.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Generation(_) | Self::Fetch(_) | Self::Image(_)
        )
    }
}

impl From<image::ImageError> for ServiceError {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e.to_string())
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Internal(format!("blocking task failed: {e}"))
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ServiceError>;
