//! Word clouds of a poet's collected works.
//!
//! Poem text is segmented with jieba (precise mode), stopwords and
//! punctuation are dropped, and the most frequent words are drawn into an
//! 800x500 PNG by [`render`]. Clients receive the PNG as base64 text. When
//! anything goes wrong a blank placeholder image is returned instead, so the
//! endpoint always yields a displayable image.

pub mod render;

use jieba_rs::Jieba;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Result, ServiceError};
use crate::utils::sanitize::sanitize_file_stem;

pub use render::{Placement, WordCloudRenderer};

/// Loading the dictionary takes a noticeable moment; do it once.
static JIEBA: Lazy<Jieba> = Lazy::new(Jieba::new);

/// Maximum number of words drawn.
pub const MAX_WORDS: usize = 200;

/// Words shorter than this are not drawn.
pub const MIN_WORD_CHARS: usize = 2;

/// Set of words to ignore.
#[derive(Debug, Default, Clone)]
pub struct Stopwords(HashSet<String>);

impl Stopwords {
    /// One word per line; blank lines ignored.
    pub fn from_lines(text: &str) -> Self {
        Self(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Read a stopword file, or log and return an empty list.
    pub fn load_or_empty(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let words = Self::from_lines(&text);
                info!(count = words.len(), "Loaded stopwords");
                words
            }
            Err(e) => {
                warn!(path = %path.display(), "Stopword list unavailable: {e}");
                Self::default()
            }
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.0.contains(word)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Segment `text` and drop stopwords and tokens without letters or digits.
pub fn segment(text: &str, stopwords: &Stopwords) -> Vec<String> {
    JIEBA
        .cut(text, true)
        .into_iter()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .filter(|w| !stopwords.contains(w))
        .map(str::to_string)
        .collect()
}

/// Count words of at least [`MIN_WORD_CHARS`] characters and return the
/// `limit` most frequent, most frequent first. Ties are ordered by word.
pub fn word_frequencies(words: &[String], limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in words {
        if word.chars().count() >= MIN_WORD_CHARS {
            *counts.entry(word.as_str()).or_default() += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(w, c)| (w.to_string(), c))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

/// Word cloud builder shared by all requests.
pub struct WordCloud {
    renderer: Option<WordCloudRenderer>,
    stopwords: Stopwords,
    segmentation_dir: Option<PathBuf>,
}

impl WordCloud {
    pub fn new(
        renderer: Option<WordCloudRenderer>,
        stopwords: Stopwords,
        segmentation_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            renderer,
            stopwords,
            segmentation_dir,
        }
    }

    /// Load the font and stopwords. A missing font is logged; requests then
    /// get the placeholder image.
    pub fn load(font: &Path, stopwords: &Path, segmentation_dir: Option<PathBuf>) -> Self {
        let renderer = match WordCloudRenderer::from_file(font) {
            Ok(r) => Some(r),
            Err(e) => {
                warn!("Word cloud font unavailable: {e}");
                None
            }
        };
        Self::new(renderer, Stopwords::load_or_empty(stopwords), segmentation_dir)
    }

    /// Segment and render. CPU-bound; call from a blocking context.
    ///
    /// Returns the base64 PNG and the filtered token list.
    pub fn build(&self, contents: &[String]) -> Result<(String, Vec<String>)> {
        let renderer = self
            .renderer
            .as_ref()
            .ok_or_else(|| ServiceError::Internal("word cloud font not loaded".into()))?;
        let text = contents.concat();
        let words = segment(&text, &self.stopwords);
        let ranked = word_frequencies(&words, MAX_WORDS);
        debug!(tokens = words.len(), distinct = ranked.len(), "Segmented poems");
        if ranked.is_empty() {
            return Err(ServiceError::NotFound("no words to draw".into()));
        }
        let image = renderer.render(&ranked);
        Ok((render::encode_png_base64(&image)?, words))
    }

    /// Base64 placeholder PNG.
    pub fn placeholder(&self) -> Result<String> {
        render::encode_png_base64(&render::placeholder_image(self.renderer.as_ref()))
    }

    /// Build the cloud for a poet's poems on the blocking pool, falling back
    /// to the placeholder image on any failure.
    pub async fn render_base64(self: Arc<Self>, name: &str, contents: Vec<String>) -> Result<String> {
        let this = Arc::clone(&self);
        let built = tokio::task::spawn_blocking(move || this.build(&contents))
            .await
            .map_err(ServiceError::from)
            .and_then(|r| r);
        match built {
            Ok((png, words)) => {
                if let Err(e) = self.save_segmentation(name, &words).await {
                    warn!(poet = %name, "Failed to save segmentation result: {e}");
                }
                Ok(png)
            }
            Err(e) => {
                warn!(poet = %name, "Word cloud generation failed: {e}");
                self.placeholder()
            }
        }
    }

    /// Persist the segmentation result for `name` when configured.
    pub async fn save_segmentation(&self, name: &str, words: &[String]) -> Result<()> {
        let Some(dir) = &self.segmentation_dir else {
            return Ok(());
        };
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!(
            "{}_segmentation_result.txt",
            sanitize_file_stem(name)
        ));
        tokio::fs::write(&path, words.join(" ")).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_stopwords_from_lines() {
        let sw = Stopwords::from_lines("之\n\n 而 \n其\n");
        assert_eq!(sw.len(), 3);
        assert!(sw.contains("而"));
        assert!(!sw.contains(""));
    }

    #[test]
    fn test_segment_drops_punctuation_and_stopwords() {
        let sw = Stopwords::from_lines("明月");
        let words = segment("床前明月光，疑是地上霜。", &sw);
        assert!(!words.iter().any(|w| w == "，" || w == "。"));
        assert!(!words.iter().any(|w| w == "明月"));
        assert!(!words.is_empty());
    }

    #[test]
    fn test_word_frequencies_ranking() {
        let words = owned(&["明月", "故乡", "明月", "月", "故乡", "明月", "举头"]);
        let ranked = word_frequencies(&words, 10);
        assert_eq!(
            ranked,
            vec![
                ("明月".to_string(), 3),
                ("故乡".to_string(), 2),
                ("举头".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_word_frequencies_limit() {
        let words = owned(&["甲乙", "丙丁", "戊己"]);
        assert_eq!(word_frequencies(&words, 2).len(), 2);
    }

    #[test]
    fn test_build_without_font_fails() {
        let wc = WordCloud::new(None, Stopwords::default(), None);
        assert!(wc.build(&owned(&["床前明月光"])).is_err());
    }

    #[test]
    fn test_placeholder_without_font_is_png() {
        use base64::Engine;
        let wc = WordCloud::new(None, Stopwords::default(), None);
        let png = base64::engine::general_purpose::STANDARD
            .decode(wc.placeholder().unwrap())
            .unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (800, 500));
    }

    #[tokio::test]
    async fn test_render_without_font_falls_back_to_placeholder() {
        let wc = Arc::new(WordCloud::new(None, Stopwords::default(), None));
        let png = Arc::clone(&wc)
            .render_base64("李白", owned(&["床前明月光"]))
            .await
            .unwrap();
        assert_eq!(png, wc.placeholder().unwrap());
    }

    #[tokio::test]
    async fn test_save_segmentation() {
        let dir = tempfile::tempdir().unwrap();
        let wc = WordCloud::new(None, Stopwords::default(), Some(dir.path().join("seg")));
        wc.save_segmentation("李白", &owned(&["明月", "故乡"]))
            .await
            .unwrap();
        let saved =
            std::fs::read_to_string(dir.path().join("seg/李白_segmentation_result.txt")).unwrap();
        assert_eq!(saved, "明月 故乡");
    }

    #[tokio::test]
    async fn test_save_segmentation_disabled() {
        let wc = WordCloud::new(None, Stopwords::default(), None);
        wc.save_segmentation("李白", &owned(&["明月"])).await.unwrap();
    }
}
