//! Ink background gateway.
//!
//! Turns poem text into a stylized ink-wash background, keyed by the text's
//! fingerprint in an [`ImageStore`]. A request moves through
//! `Requested -> CacheHit | Generating -> Stored | Fallback`:
//!
//! - **CacheHit**: the artifact already exists; no external call is made.
//! - **Stored**: generation, download, finishing, and the disk write all
//!   succeeded.
//! - **Fallback**: any step of the miss path failed. The failure is logged with
//!   the input text and the caller gets the static fallback URL instead.
//!
//! Concurrent misses for the same fingerprint are collapsed: the first caller
//! generates while later callers wait on a per-fingerprint lock and then find
//! the stored artifact.

pub mod postprocess;

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::cache::{fingerprint, normalize_prompt, CacheEntry, ImageStore};
use crate::error::{Result, ServiceError};
use crate::providers::{GenerationParameters, ImageGenerator, ImageRequest};

/// Style template wrapped around the poem text.
const PROMPT_TEMPLATE: &str = "传统水墨风格插画，基于诗句：{content}
元素要求：
- 使用水墨笔触技法，保留适当飞白效果
- 布局采用散点透视构图
- 色调为彩色+不要只有黑白
- 全部为景物，不要出现文字
- 用色建议：仅保留10%以下朱砂/花青点缀
- 构图参考：南宋马远“边角之景”布局";

/// Build the generation prompt for already-normalized poem text.
pub fn build_prompt(content: &str) -> String {
    PROMPT_TEMPLATE.replace("{content}", content)
}

/// Result of [`InkGateway::get_or_create_background`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InkOutcome {
    /// Served from disk.
    CacheHit(CacheEntry),
    /// Freshly generated and written to disk.
    Stored(CacheEntry),
    /// Generation failed; `url` points at the static fallback background.
    Fallback { url: String },
}

impl InkOutcome {
    /// URL the client should load.
    pub fn url(&self) -> &str {
        match self {
            Self::CacheHit(entry) | Self::Stored(entry) => &entry.url,
            Self::Fallback { url } => url,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Content-addressed cache in front of an [`ImageGenerator`].
pub struct InkGateway {
    store: ImageStore,
    generator: Option<Arc<dyn ImageGenerator>>,
    model: String,
    parameters: GenerationParameters,
    fallback_url: String,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl InkGateway {
    /// Create a gateway. With `generator = None` every miss falls back.
    pub fn new(
        store: ImageStore,
        generator: Option<Arc<dyn ImageGenerator>>,
        model: impl Into<String>,
        fallback_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            generator,
            model: model.into(),
            parameters: GenerationParameters::default(),
            fallback_url: fallback_url.into(),
            in_flight: DashMap::new(),
        }
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    pub fn fallback_url(&self) -> &str {
        &self.fallback_url
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Return a background for `text`, generating and caching it on a miss.
    ///
    /// Never fails: pipeline errors are logged and reported as
    /// [`InkOutcome::Fallback`].
    pub async fn get_or_create_background(&self, text: &str) -> InkOutcome {
        let content = normalize_prompt(text);
        let fp = fingerprint(content);

        if let Some(entry) = self.store.lookup(&fp).await {
            debug!(fingerprint = %fp, "Ink background cache hit");
            return InkOutcome::CacheHit(entry);
        }

        let lock = self
            .in_flight
            .entry(fp.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let outcome = {
            let _guard = lock.lock().await;
            // Another request may have stored it while we waited.
            match self.store.lookup(&fp).await {
                Some(entry) => {
                    debug!(fingerprint = %fp, "Ink background stored by concurrent request");
                    InkOutcome::CacheHit(entry)
                }
                None => match self.generate_and_store(content, &fp).await {
                    Ok(entry) => {
                        info!(fingerprint = %fp, "Ink background generated");
                        InkOutcome::Stored(entry)
                    }
                    Err(e) => {
                        error!(content = %content, error = %e, "Ink background generation failed");
                        InkOutcome::Fallback {
                            url: self.fallback_url.clone(),
                        }
                    }
                },
            }
        };

        // Map entry + our clone = 2; anything more means someone is queued.
        self.in_flight
            .remove_if(&fp, |_, m| Arc::strong_count(m) <= 2);
        outcome
    }

    async fn generate_and_store(&self, content: &str, fp: &str) -> Result<CacheEntry> {
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| ServiceError::Generation("no image generator configured".into()))?;

        let request = ImageRequest {
            model: self.model.clone(),
            prompt: build_prompt(content),
            parameters: self.parameters.clone(),
        };
        let image_url = generator.generate(&request).await?;
        let raw = generator.fetch(&image_url).await?;
        let finished = tokio::task::spawn_blocking(move || postprocess::ink_finish(&raw)).await??;
        self.store.put(fp, &finished).await
    }
}
