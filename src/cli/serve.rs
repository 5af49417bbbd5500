//! `shiyun serve`: run the HTTP server.

use anyhow::{Context, Result};
use tracing::info;

use shiyun::api::{build_router, start_server, AppState};
use shiyun::config::Config;

pub async fn cmd_serve(mut config: Config, bind: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        static_root = %config.paths.static_root.display(),
        "Starting shiyun"
    );

    let state = AppState::from_config(&config)
        .await
        .context("Failed to initialize service state")?;
    let app = build_router(state, &config.server, &config.paths);

    start_server(&config.server, app)
        .await
        .with_context(|| format!("Server on {} failed", config.server.addr()))?;
    info!("Server stopped");
    Ok(())
}
