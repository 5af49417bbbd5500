//! Content-addressed on-disk store for generated background images.
//!
//! Each artifact lives at `{root}/{fingerprint}.jpg`, where the fingerprint is
//! the MD5 hex digest of the first [`MAX_PROMPT_CHARS`] characters of the
//! prompt text. Entries are never mutated or evicted by the service.
//!
//! Writes go to a uniquely named temp file in the same directory and are then
//! renamed into place, so a reader either sees no file or a complete JPEG.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Result;
use crate::utils::sanitize::truncate_chars;

/// Prompt text beyond this many characters does not affect the fingerprint.
pub const MAX_PROMPT_CHARS: usize = 200;

/// Extension of stored artifacts.
const ARTIFACT_EXT: &str = "jpg";

/// Truncate prompt text to the portion that participates in caching.
pub fn normalize_prompt(text: &str) -> &str {
    truncate_chars(text, MAX_PROMPT_CHARS)
}

/// Fingerprint of prompt text: 32 lowercase hex chars.
pub fn fingerprint(text: &str) -> String {
    format!("{:x}", md5::compute(normalize_prompt(text).as_bytes()))
}

/// A stored (or to-be-stored) artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub fingerprint: String,
    /// Absolute or root-relative filesystem path of the artifact.
    pub location: PathBuf,
    /// Public URL the front-end loads the artifact from.
    pub url: String,
}

/// Directory-backed artifact store.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    url_prefix: String,
}

impl ImageStore {
    /// Create a store rooted at `root`, publishing artifacts under `url_prefix`.
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        let url_prefix = url_prefix.into();
        Self {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the cache directory if it does not exist.
    pub async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Describe the entry for `fingerprint` without touching the disk.
    pub fn entry(&self, fingerprint: &str) -> CacheEntry {
        CacheEntry {
            fingerprint: fingerprint.to_string(),
            location: self.root.join(format!("{fingerprint}.{ARTIFACT_EXT}")),
            url: format!("{}/{fingerprint}.{ARTIFACT_EXT}", self.url_prefix),
        }
    }

    /// Return the entry if its artifact is present on disk.
    pub async fn lookup(&self, fingerprint: &str) -> Option<CacheEntry> {
        let entry = self.entry(fingerprint);
        match tokio::fs::try_exists(&entry.location).await {
            Ok(true) => Some(entry),
            Ok(false) => None,
            Err(e) => {
                warn!(
                    path = %entry.location.display(),
                    "Cannot stat cached background, treating as miss: {e}"
                );
                None
            }
        }
    }

    /// Persist `bytes` as the artifact for `fingerprint`, replacing any
    /// previous artifact.
    pub async fn put(&self, fingerprint: &str, bytes: &[u8]) -> Result<CacheEntry> {
        let entry = self.entry(fingerprint);
        let tmp = self
            .root
            .join(format!(".{fingerprint}.{}.tmp", uuid::Uuid::new_v4().simple()));

        if let Err(e) = tokio::fs::write(&tmp, bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, &entry.location).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!(fingerprint, bytes = bytes.len(), "Stored background");
        Ok(entry)
    }
}
