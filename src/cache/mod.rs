//! Content-addressed image cache for generated ink backgrounds.

pub mod image_store;

pub use image_store::{fingerprint, normalize_prompt, CacheEntry, ImageStore, MAX_PROMPT_CHARS};
