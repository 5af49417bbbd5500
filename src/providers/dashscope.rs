//! DashScope (Alibaba Cloud Model Studio) text-to-image client.
//!
//! Generation is asynchronous on the service side: the client submits a task
//! with `X-DashScope-Async: enable`, then polls the task endpoint until it
//! reaches a terminal status or the configured generation timeout elapses.
//! Every individual HTTP call carries the client-level request timeout.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::InkConfig;
use crate::error::{Result, ServiceError};

use super::{ImageGenerator, ImageRequest};

const SYNTHESIS_PATH: &str = "/api/v1/services/aigc/text2image/image-synthesis";
const TASKS_PATH: &str = "/api/v1/tasks";

/// DashScope image synthesis provider.
pub struct DashScopeProvider {
    api_key: String,
    base_url: String,
    client: Client,
    poll_interval: Duration,
    generation_timeout: Duration,
}

impl std::fmt::Debug for DashScopeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashScopeProvider")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("poll_interval", &self.poll_interval)
            .field("generation_timeout", &self.generation_timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TaskEnvelope {
    output: Option<TaskOutput>,
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskOutput {
    task_id: Option<String>,
    task_status: Option<String>,
    #[serde(default)]
    results: Vec<TaskResult>,
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskResult {
    url: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

/// Where a task stands after one status read.
#[derive(Debug, PartialEq, Eq)]
enum TaskState {
    Pending,
    Succeeded(String),
}

impl DashScopeProvider {
    /// Build a provider with explicit settings.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        request_timeout: Duration,
        poll_interval: Duration,
        generation_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ServiceError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            poll_interval,
            generation_timeout,
        })
    }

    /// Build from config. Returns `Ok(None)` when no API key is configured.
    pub fn from_config(config: &InkConfig) -> Result<Option<Self>> {
        let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) else {
            return Ok(None);
        };
        Self::new(
            key,
            &config.base_url,
            config.request_timeout(),
            config.poll_interval(),
            config.generation_timeout(),
        )
        .map(Some)
    }

    /// JSON body for the task submission endpoint.
    pub fn build_request_body(request: &ImageRequest) -> Value {
        json!({
            "model": request.model,
            "input": { "prompt": request.prompt },
            "parameters": request.parameters,
        })
    }

    async fn submit(&self, request: &ImageRequest) -> Result<TaskEnvelope> {
        let resp = self
            .client
            .post(format!("{}{SYNTHESIS_PATH}", self.base_url))
            .bearer_auth(&self.api_key)
            .header("X-DashScope-Async", "enable")
            .json(&Self::build_request_body(request))
            .send()
            .await
            .map_err(|e| ServiceError::Generation(format!("submit request failed: {e}")))?;
        Self::read_envelope(resp).await
    }

    async fn poll(&self, task_id: &str) -> Result<TaskEnvelope> {
        let resp = self
            .client
            .get(format!("{}{TASKS_PATH}/{task_id}", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ServiceError::Generation(format!("task status request failed: {e}")))?;
        Self::read_envelope(resp).await
    }

    async fn read_envelope(resp: reqwest::Response) -> Result<TaskEnvelope> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ServiceError::Generation(format!("failed to read response: {e}")))?;
        if !status.is_success() {
            return Err(api_error(status, &body));
        }
        serde_json::from_str(&body)
            .map_err(|e| ServiceError::Generation(format!("malformed response: {e}")))
    }

    async fn wait_for(&self, task_id: &str) -> Result<String> {
        let waiting = async {
            loop {
                tokio::time::sleep(self.poll_interval).await;
                let envelope = self.poll(task_id).await?;
                if let TaskState::Succeeded(url) = task_state(&envelope)? {
                    return Ok::<_, ServiceError>(url);
                }
            }
        };
        tokio::time::timeout(self.generation_timeout, waiting)
            .await
            .map_err(|_| {
                ServiceError::Generation(format!(
                    "task {task_id} did not finish within {}s",
                    self.generation_timeout.as_secs()
                ))
            })?
    }
}

/// Turn a non-success HTTP response into a generation error.
fn api_error(status: StatusCode, body: &str) -> ServiceError {
    let detail = serde_json::from_str::<TaskEnvelope>(body)
        .ok()
        .and_then(|env| match (env.code, env.message) {
            (Some(code), Some(msg)) => Some(format!("{code}: {msg}")),
            (Some(code), None) => Some(code),
            (None, Some(msg)) => Some(msg),
            (None, None) => None,
        })
        .unwrap_or_else(|| body.chars().take(200).collect());
    ServiceError::Generation(format!("HTTP {}: {detail}", status.as_u16()))
}

/// Interpret a task envelope.
fn task_state(envelope: &TaskEnvelope) -> Result<TaskState> {
    let output = envelope
        .output
        .as_ref()
        .ok_or_else(|| ServiceError::Generation("response has no output".into()))?;
    let status = output.task_status.as_deref().unwrap_or("UNKNOWN");
    match status {
        "PENDING" | "RUNNING" | "SUSPENDED" => Ok(TaskState::Pending),
        "SUCCEEDED" => {
            let first = output
                .results
                .first()
                .ok_or_else(|| ServiceError::Generation("task succeeded without results".into()))?;
            match &first.url {
                Some(url) if !url.is_empty() => Ok(TaskState::Succeeded(url.clone())),
                _ => Err(ServiceError::Generation(format!(
                    "first result has no url ({})",
                    first
                        .message
                        .as_deref()
                        .or(first.code.as_deref())
                        .unwrap_or("no detail")
                ))),
            }
        }
        other => Err(ServiceError::Generation(format!(
            "task {other}: {}",
            output
                .message
                .as_deref()
                .or(output.code.as_deref())
                .unwrap_or("no detail")
        ))),
    }
}

#[async_trait]
impl ImageGenerator for DashScopeProvider {
    async fn generate(&self, request: &ImageRequest) -> Result<String> {
        let envelope = self.submit(request).await?;
        if let TaskState::Succeeded(url) = task_state(&envelope)? {
            return Ok(url);
        }
        let task_id = envelope
            .output
            .and_then(|o| o.task_id)
            .ok_or_else(|| ServiceError::Generation("submission returned no task id".into()))?;
        debug!(task_id = %task_id, model = %request.model, "Image task submitted");
        self.wait_for(&task_id).await
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ServiceError::Fetch(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ServiceError::Fetch(format!(
                "HTTP {} from image host",
                resp.status().as_u16()
            )));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ServiceError::Fetch(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
