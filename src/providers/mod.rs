//! Text-to-image providers.
//!
//! The ink gateway only depends on [`ImageGenerator`]; the DashScope client is
//! the production implementation.

pub mod dashscope;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

pub use dashscope::DashScopeProvider;

/// Fixed generation parameters sent with every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationParameters {
    /// Output resolution as `"{width}*{height}"`.
    pub size: String,
    /// Number of images to generate.
    pub n: u32,
    pub style: String,
    pub composition_ratio: String,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            size: "780*480".to_string(),
            n: 1,
            style: "traditional ink painting".to_string(),
            composition_ratio: "3:2".to_string(),
        }
    }
}

/// A single text-to-image request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub parameters: GenerationParameters,
}

/// A service that turns a prompt into a downloadable image.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Run a generation and return the URL of the first result image.
    ///
    /// Fails with [`ServiceError::Generation`](crate::error::ServiceError::Generation)
    /// when the service reports a non-success status.
    async fn generate(&self, request: &ImageRequest) -> Result<String>;

    /// Download image bytes from a result URL.
    ///
    /// Fails with [`ServiceError::Fetch`](crate::error::ServiceError::Fetch)
    /// on network errors or non-success responses.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
