//! Command-line interface.

pub mod fingerprint;
pub mod serve;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "shiyun=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(name = "shiyun", version, about = "Classical poetry knowledge-graph service")]
pub struct Cli {
    /// Config file (defaults to ./shiyun.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Override the bind address
        #[arg(long)]
        bind: Option<String>,
        /// Override the port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the cache fingerprint and URL for a piece of text
    Fingerprint {
        /// Poem text
        text: String,
    },
}

/// Install the global tracing subscriber.
pub fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
