//! End-to-end tests for POST /generate_ink.
//!
//! The full router is built from a `Config` the way `shiyun serve` does it,
//! with wiremock standing in for DashScope and the image host.

use std::io::Cursor;
use std::path::Path;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use shiyun::api::{build_router, AppState};
use shiyun::config::Config;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SYNTHESIS: &str = "/api/v1/services/aigc/text2image/image-synthesis";

fn sample_png() -> Vec<u8> {
    let img = RgbImage::from_fn(78, 48, |x, y| Rgb([(x * 3) as u8, (y * 5) as u8, 120]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn fallback_jpeg() -> Vec<u8> {
    let img = RgbImage::from_pixel(8, 8, Rgb([240, 236, 226]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
    out.into_inner()
}

async fn router_for(root: &Path, base_url: String) -> Router {
    let mut config = Config::default();
    config.paths.static_root = root.join("static");
    config.paths.templates_dir = root.join("templates");
    config.paths.data_dir = root.join("data");
    config.ink.api_key = Some("test-key".into());
    config.ink.base_url = base_url;
    config.ink.poll_interval_ms = 10;
    config.ink.request_timeout_secs = 2;
    std::fs::create_dir_all(root.join("static/images")).unwrap();
    std::fs::write(config.paths.ink_fallback_file(), fallback_jpeg()).unwrap();
    let state = AppState::from_config(&config).await.unwrap();
    build_router(state, &config.server, &config.paths)
}

async fn call(router: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, body)
}

async fn generate(router: &Router, body: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/generate_ink")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, body) = call(router, req).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn mount_dashscope(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(SYNTHESIS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": {"task_id": "t-1", "task_status": "PENDING"}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tasks/t-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": {
                "task_id": "t-1",
                "task_status": "SUCCEEDED",
                "results": [{"url": format!("{}/results/t-1.png", server.uri())}]
            }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/results/t-1.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(sample_png()))
        .mount(server)
        .await;
}

async fn submissions(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == SYNTHESIS)
        .count()
}

#[tokio::test]
async fn test_cold_cache_then_hit() {
    let server = MockServer::start().await;
    mount_dashscope(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let router = router_for(dir.path(), server.uri()).await;

    let (status, first) = generate(&router, r#"{"content":"床前明月光"}"#).await;
    assert_eq!(status, StatusCode::OK);
    let url = first["url"].as_str().unwrap().to_string();
    let stem = url
        .strip_prefix("/static/images/poem_bg/")
        .and_then(|s| s.strip_suffix(".jpg"))
        .unwrap();
    assert_eq!(stem.len(), 32);
    assert!(stem.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert_eq!(submissions(&server).await, 1);

    let stored = dir
        .path()
        .join("static/images/poem_bg")
        .join(format!("{stem}.jpg"));
    let bytes = std::fs::read(&stored).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

    let (status, second) = generate(&router, r#"{"content":"床前明月光"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["url"], url.as_str());
    assert_eq!(submissions(&server).await, 1);

    let req = Request::builder().uri(&url).body(Body::empty()).unwrap();
    let (status, served) = call(&router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served, bytes);
}

#[tokio::test]
async fn test_long_text_shares_cache_by_prefix() {
    let server = MockServer::start().await;
    mount_dashscope(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let router = router_for(dir.path(), server.uri()).await;

    let prefix = "月".repeat(200);
    let a = json!({ "content": format!("{prefix}甲") }).to_string();
    let b = json!({ "content": format!("{prefix}乙乙乙") }).to_string();
    let (_, first) = generate(&router, &a).await;
    let (_, second) = generate(&router, &b).await;
    assert_eq!(first["url"], second["url"]);
    assert_eq!(submissions(&server).await, 1);
}

#[tokio::test]
async fn test_missing_content_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_for(dir.path(), "http://127.0.0.1:9".into()).await;
    let (status, body) = generate(&router, "{}").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "missing content"}));
}

#[tokio::test]
async fn test_unreachable_service_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_for(dir.path(), "http://127.0.0.1:9".into()).await;
    let (status, body) = generate(&router, r#"{"content":"春眠不觉晓"}"#).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body,
        json!({"error": "service busy", "fallback": "/static/images/default_ink_bg.jpg"})
    );
    let cached = std::fs::read_dir(dir.path().join("static/images/poem_bg"))
        .unwrap()
        .count();
    assert_eq!(cached, 0);

    let req = Request::builder()
        .uri(body["fallback"].as_str().unwrap())
        .body(Body::empty())
        .unwrap();
    let (status, served) = call(&router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served, fallback_jpeg());
}

#[tokio::test]
async fn test_oversized_poem_is_truncated_not_rejected() {
    let server = MockServer::start().await;
    mount_dashscope(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let router = router_for(dir.path(), server.uri()).await;

    // ~90 KB of UTF-8.
    let long = json!({ "content": "月".repeat(30_000) }).to_string();
    assert!(long.len() > 64 * 1024);
    let short = json!({ "content": "月".repeat(200) }).to_string();

    let (status, first) = generate(&router, &long).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = generate(&router, &short).await;
    assert_eq!(first["url"], second["url"]);
    assert_eq!(submissions(&server).await, 1);
}
