//! Service configuration.
//!
//! Values are layered: compiled-in defaults, then an optional TOML file, then
//! environment variables (a `.env` file is read first when present). Secrets
//! such as `DASHSCOPE_API_KEY` and `NEO4J_PASSWORD` are normally supplied
//! through the environment only.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub use crate::api::config::ServerConfig;
use crate::error::{Result, ServiceError};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "shiyun.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub paths: PathsConfig,
    pub graph: GraphConfig,
    pub ink: InkConfig,
}

/// Filesystem locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root served under `/static`. Holds `images/`, `fonts/`.
    pub static_root: PathBuf,
    /// Directory containing `index.html`.
    pub templates_dir: PathBuf,
    /// Directory containing `introduction.xlsx` and `stopwords.txt`.
    pub data_dir: PathBuf,
    /// Where word segmentation results are written. Unset disables it.
    pub segmentation_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            static_root: PathBuf::from("static"),
            templates_dir: PathBuf::from("templates"),
            data_dir: PathBuf::from("data"),
            segmentation_dir: None,
        }
    }
}

impl PathsConfig {
    /// `{static_root}/images/poem_bg`
    pub fn ink_cache_dir(&self) -> PathBuf {
        self.static_root.join("images").join("poem_bg")
    }

    /// `{static_root}/images/default_ink_bg.jpg`
    pub fn ink_fallback_file(&self) -> PathBuf {
        self.static_root.join("images").join("default_ink_bg.jpg")
    }

    pub fn font_file(&self) -> PathBuf {
        self.static_root.join("fonts").join("simhei.ttf")
    }

    pub fn bio_file(&self) -> PathBuf {
        self.data_dir.join("introduction.xlsx")
    }

    pub fn stopwords_file(&self) -> PathBuf {
        self.data_dir.join("stopwords.txt")
    }
}

/// Neo4j connection settings (HTTP transactional API).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Base URI of the Neo4j HTTP endpoint, e.g. `http://localhost:7474`.
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphConfig")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:7474".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            database: "neo4j".to_string(),
            timeout_secs: 30,
        }
    }
}

impl GraphConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Ink background generation (DashScope text-to-image).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InkConfig {
    /// DashScope API key. Without it every cache miss falls back.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
    /// Upper bound on waiting for an asynchronous generation task.
    pub generation_timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// Public URL prefix that maps onto the cache directory.
    pub url_prefix: String,
    /// Public URL of the static fallback background.
    pub fallback_url: String,
}

impl std::fmt::Debug for InkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InkConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("generation_timeout_secs", &self.generation_timeout_secs)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("url_prefix", &self.url_prefix)
            .field("fallback_url", &self.fallback_url)
            .finish()
    }
}

impl Default for InkConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://dashscope.aliyuncs.com".to_string(),
            model: "wanx2.1-t2i-turbo".to_string(),
            request_timeout_secs: 30,
            generation_timeout_secs: 120,
            poll_interval_ms: 1000,
            url_prefix: "/static/images/poem_bg".to_string(),
            fallback_url: "/static/images/default_ink_bg.jpg".to_string(),
        }
    }
}

impl InkConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }
}

impl Config {
    /// Load configuration.
    ///
    /// `path` is an explicit config file; when `None`, [`DEFAULT_CONFIG_FILE`]
    /// is used if it exists. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                warn!("Failed to read .env file: {e}");
            }
        }

        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ServiceError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&raw)
            .map_err(|e| ServiceError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("SHIYUN_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = non_empty("SHIYUN_PORT") {
            match v.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Ignoring unparseable SHIYUN_PORT={v}"),
            }
        }
        if let Some(v) = non_empty("SHIYUN_STATIC_ROOT") {
            self.paths.static_root = PathBuf::from(v);
        }
        if let Some(v) = non_empty("SHIYUN_DATA_DIR") {
            self.paths.data_dir = PathBuf::from(v);
        }
        if let Some(v) = non_empty("NEO4J_URI") {
            self.graph.uri = normalize_graph_uri(&v);
        }
        if let Some(v) = non_empty("NEO4J_USER") {
            self.graph.user = v;
        }
        if let Some(v) = lookup("NEO4J_PASSWORD") {
            self.graph.password = v;
        }
        if let Some(v) = non_empty("NEO4J_DATABASE") {
            self.graph.database = v;
        }
        if let Some(v) = non_empty("DASHSCOPE_API_KEY") {
            self.ink.api_key = Some(v);
        }
        if let Some(v) = non_empty("DASHSCOPE_BASE_URL") {
            self.ink.base_url = v;
        }
        debug!(config = ?self, "Configuration resolved");
    }
}

/// Map a `bolt://host:7687` URI onto the HTTP endpoint of the same host.
///
/// Deployments often carry a Bolt URI in `NEO4J_URI`; this service speaks the
/// HTTP API, which listens on 7474 by default.
pub fn normalize_graph_uri(raw: &str) -> String {
    let raw = raw.trim().trim_end_matches('/');
    for scheme in ["bolt://", "neo4j://", "bolt+s://", "neo4j+s://"] {
        if let Some(rest) = raw.strip_prefix(scheme) {
            let host = rest.split(':').next().unwrap_or(rest);
            let http = if scheme.ends_with("+s://") {
                "https"
            } else {
                "http"
            };
            return format!("{http}://{host}:7474");
        }
    }
    raw.to_string()
}
