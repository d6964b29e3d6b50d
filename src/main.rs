//! crawld main entry point
//!
//! Starts the TCP command server that drives the web crawler.

use clap::Parser;
use crawld::config::load_config;
use crawld::{Config, HttpLinkProvider, Server};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// crawld: a multi-client crawl coordination server
///
/// Clients connect over TCP (default port 4949) and issue line-oriented
/// commands to initialize schema, start and stop crawls, pause and resume
/// them across restarts, and switch between logical databases. Send `help`
/// for the command surface.
#[derive(Parser, Debug)]
#[command(name = "crawld")]
#[command(version)]
#[command(about = "A multi-client crawl coordination server", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Listen port, overriding the configuration
    #[arg(short, long)]
    port: Option<u16>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("loading configuration from {}", path.display());
            load_config(path)?
        }
        None => Config::default(),
    };
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let provider = HttpLinkProvider::new(
        &config.crawler.user_agent,
        Duration::from_secs(config.crawler.fetch_timeout_secs),
    )?;

    let server = Server::bind(config, Arc::new(provider)).await?;
    server.run().await?;

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawld=info,warn"),
            1 => EnvFilter::new("crawld=debug,info"),
            2 => EnvFilter::new("crawld=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
