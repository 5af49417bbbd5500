//! Axum HTTP server.

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::bio::BioStore;
use crate::cache::ImageStore;
use crate::config::{Config, PathsConfig, ServerConfig};
use crate::error::{Result, ServiceError};
use crate::graph::{GraphStore, Neo4jStore, PoetRepository};
use crate::ink::InkGateway;
use crate::providers::{DashScopeProvider, ImageGenerator};
use crate::wordcloud::WordCloud;

use super::routes;

/// Shared state for all API handlers. Built once at startup.
pub struct AppState {
    /// Ink background cache and generator.
    pub ink: Arc<InkGateway>,
    /// Graph queries.
    pub poets: PoetRepository,
    /// Biographies loaded from the introduction spreadsheet.
    pub bios: Arc<BioStore>,
    pub wordcloud: Arc<WordCloud>,
}

impl AppState {
    pub fn new(
        ink: Arc<InkGateway>,
        poets: PoetRepository,
        bios: Arc<BioStore>,
        wordcloud: Arc<WordCloud>,
    ) -> Self {
        Self {
            ink,
            poets,
            bios,
            wordcloud,
        }
    }

    /// Wire every component from configuration.
    ///
    /// Missing optional resources (API key, spreadsheet, font, stopwords)
    /// are logged and degrade the matching feature instead of failing. The
    /// fallback background is required.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let paths = &config.paths;

        let store = ImageStore::new(paths.ink_cache_dir(), config.ink.url_prefix.clone());
        store.ensure_root().await?;
        let generator = DashScopeProvider::from_config(&config.ink)?
            .map(|p| Arc::new(p) as Arc<dyn ImageGenerator>);
        if generator.is_none() {
            warn!("DASHSCOPE_API_KEY not set; uncached ink backgrounds will fall back");
        }
        let ink = InkGateway::new(
            store,
            generator,
            config.ink.model.clone(),
            config.ink.fallback_url.clone(),
        );

        let graph: Arc<dyn GraphStore> = Arc::new(Neo4jStore::new(&config.graph)?);
        info!(uri = %config.graph.uri, database = %config.graph.database, "Graph store configured");

        // Served by every fallback response.
        let fallback = paths.ink_fallback_file();
        if !tokio::fs::try_exists(&fallback).await.unwrap_or(false) {
            return Err(ServiceError::Config(format!(
                "fallback ink background not found: {}",
                fallback.display()
            )));
        }

        let bio_file = paths.bio_file();
        let bios = tokio::task::spawn_blocking(move || BioStore::load_or_empty(&bio_file)).await?;
        let (font, stopwords, segmentation_dir) = (
            paths.font_file(),
            paths.stopwords_file(),
            paths.segmentation_dir.clone(),
        );
        let wordcloud = tokio::task::spawn_blocking(move || {
            WordCloud::load(&font, &stopwords, segmentation_dir)
        })
        .await?;

        Ok(Self::new(
            Arc::new(ink),
            PoetRepository::new(graph),
            Arc::new(bios),
            Arc::new(wordcloud),
        ))
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

/// Build the axum router with all routes, static files and the SPA fallback.
pub fn build_router(state: AppState, server: &ServerConfig, paths: &PathsConfig) -> Router {
    let shared_state = Arc::new(state);

    let api = Router::new()
        // Ink backgrounds
        .route("/generate_ink", post(routes::ink::generate_ink))
        // Health
        .route("/api/health", get(routes::health::get_health))
        // Poets
        .route("/api/poets", get(routes::poets::list_poets))
        .route("/api/poet/{name}", get(routes::poets::get_poet))
        .route("/api/poet_bio/{name}", get(routes::poets::get_poet_bio))
        .route("/api/poet_network/{name}", get(routes::poets::get_poet_network))
        // Poems
        .route("/api/search_poem", get(routes::poems::search_poem))
        .route("/api/search_poem_titles", get(routes::poems::search_poem_titles))
        // Statistics
        .route("/api/poet_heatmap_data/{name}", get(routes::stats::heatmap))
        .route("/api/poet_annual_counts/{name}", get(routes::stats::annual_counts))
        .route("/api/poet_anshi_periods/{name}", get(routes::stats::anshi_periods))
        .route("/api/poet_office_periods/{name}", get(routes::stats::office_periods))
        // Imagery
        .route("/api/poem_imagery", get(routes::imagery::poem_imagery))
        .route("/api/imagery_cloud", get(routes::imagery::imagery_cloud))
        .route("/api/period_imagery/{name}", get(routes::imagery::period_imagery))
        // Word cloud
        .route("/wordcloud/{name}", get(routes::wordcloud::get_wordcloud))
        .nest_service("/static", ServeDir::new(&paths.static_root))
        .fallback_service(ServeFile::new(paths.templates_dir.join("index.html")))
        .layer(DefaultBodyLimit::max(server.body_limit))
        .layer(cors_layer(&server.cors_origins))
        .layer(TraceLayer::new_for_http());

    api.with_state(shared_state)
}

/// Serve `app` on `server.addr()` until Ctrl+C or SIGTERM.
pub async fn start_server(server: &ServerConfig, app: Router) -> std::io::Result<()> {
    let addr = server.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down gracefully"),
        _ = terminate => info!("Received SIGTERM, shutting down gracefully"),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Router fixtures backed by in-memory stores.

    use super::*;
    use crate::graph::testing::MemoryGraph;
    use crate::providers::MockImageGenerator;
    use crate::wordcloud::Stopwords;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    pub const FALLBACK: &str = "/static/images/default_ink_bg.jpg";

    pub struct Fixture {
        pub dir: tempfile::TempDir,
        pub graph: Arc<MemoryGraph>,
        pub router: Router,
    }

    pub fn fixture_with(
        graph: MemoryGraph,
        generator: Option<MockImageGenerator>,
        bios: BioStore,
    ) -> Fixture {
        fixture_with_server(&ServerConfig::default(), graph, generator, bios)
    }

    pub fn fixture_with_server(
        server: &ServerConfig,
        graph: MemoryGraph,
        generator: Option<MockImageGenerator>,
        bios: BioStore,
    ) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathsConfig {
            static_root: dir.path().join("static"),
            templates_dir: dir.path().join("templates"),
            data_dir: dir.path().join("data"),
            segmentation_dir: None,
        };
        std::fs::create_dir_all(paths.ink_cache_dir()).unwrap();
        std::fs::create_dir_all(&paths.templates_dir).unwrap();
        std::fs::write(paths.templates_dir.join("index.html"), "<html>shiyun</html>").unwrap();
        std::fs::write(paths.ink_fallback_file(), b"fallback-jpeg").unwrap();

        let store = ImageStore::new(paths.ink_cache_dir(), "/static/images/poem_bg");
        let generator = generator.map(|m| Arc::new(m) as Arc<dyn ImageGenerator>);
        let ink = InkGateway::new(store, generator, "wanx2.1-t2i-turbo", FALLBACK);
        let graph = Arc::new(graph);
        let state = AppState::new(
            Arc::new(ink),
            PoetRepository::new(graph.clone()),
            Arc::new(bios),
            Arc::new(WordCloud::new(None, Stopwords::default(), None)),
        );
        let router = build_router(state, server, &paths);
        Fixture { dir, graph, router }
    }

    pub fn fixture(graph: MemoryGraph) -> Fixture {
        fixture_with(graph, None, BioStore::default())
    }

    pub async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        (status, body)
    }

    pub async fn get(router: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        send(router, req).await
    }

    pub async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
        let (status, body) = get(router, uri).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    pub async fn post_json(router: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, body) = send(router, req).await;
        (status, serde_json::from_slice(&body).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{fixture, get, get_json, post_json, FALLBACK};
    use super::{cors_layer, AppState};
    use crate::config::Config;
    use crate::error::ServiceError;
    use crate::graph::testing::MemoryGraph;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_health_route() {
        let fx = fixture(MemoryGraph::new());
        let (status, body) = get_json(&fx.router, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_spa_fallback_serves_index() {
        let fx = fixture(MemoryGraph::new());
        let (status, body) = get(&fx.router, "/poet/libai").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"<html>shiyun</html>");
    }

    #[tokio::test]
    async fn test_static_files_served() {
        let fx = fixture(MemoryGraph::new());
        let file = fx.dir.path().join("static/images/poem_bg/abc.jpg");
        std::fs::write(&file, b"jpeg-bytes").unwrap();
        let (status, body) = get(&fx.router, "/static/images/poem_bg/abc.jpg").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"jpeg-bytes");

        let (status, _) = get(&fx.router, "/static/images/missing.jpg").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_cors_layer_variants() {
        let _permissive = cors_layer(&[]);
        let _listed = cors_layer(&["http://localhost:3000".into(), "bad\norigin".into()]);
    }

    fn config_in(root: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.paths.static_root = root.join("static");
        config.paths.data_dir = root.join("data");
        config
    }

    #[tokio::test]
    async fn test_from_config_without_key() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::create_dir_all(config.paths.ink_cache_dir()).unwrap();
        std::fs::write(config.paths.ink_fallback_file(), b"jpeg").unwrap();
        let state = AppState::from_config(&config).await.unwrap();
        assert!(!state.ink.has_generator());
        assert!(state.bios.is_empty());
        assert!(state.ink.store().root().is_dir());
    }

    #[tokio::test]
    async fn test_from_config_requires_fallback_background() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let err = AppState::from_config(&config).await.err().unwrap();
        assert!(matches!(err, ServiceError::Config(ref m) if m.contains("default_ink_bg.jpg")));
    }

    #[tokio::test]
    async fn test_fallback_url_is_served() {
        let fx = fixture(MemoryGraph::new());
        let (status, json) =
            post_json(&fx.router, "/generate_ink", r#"{"content":"春眠不觉晓"}"#).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["fallback"], FALLBACK);

        let (status, body) = get(&fx.router, FALLBACK).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"fallback-jpeg");
    }
}
