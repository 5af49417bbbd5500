use anyhow::{Context, Result};
use clap::Parser;

mod cli;

use cli::{Cli, Command};
use shiyun::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::init_logging(cli.json);

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Some(Command::Fingerprint { text }) => {
            cli::fingerprint::cmd_fingerprint(&config, &text);
            Ok(())
        }
        Some(Command::Serve { bind, port }) => cli::serve::cmd_serve(config, bind, port).await,
        None => cli::serve::cmd_serve(config, None, None).await,
    }
}
