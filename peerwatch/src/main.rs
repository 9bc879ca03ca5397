//! peerwatch - watch peer configuration directories.
//!
//! This binary watches one or more peer directories and prints a JSON line on
//! stdout for every peer that should be reloaded or removed. Logs go to
//! stderr.
//!
//! # Environment Variables
//!
//! See the [`config`](peerwatch::config) module for available configuration
//! options.

use std::io;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use peerwatch::config::{Config, LogFormat};
use peerwatch::host;
use peerwatch::sink::JsonLinesSink;
use peerwatch::watcher::PeerWatcher;

/// peerwatch - live reload of peer configuration directories.
///
/// Prints one JSON object per peer action to stdout.
#[derive(Parser, Debug)]
#[command(name = "peerwatch")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    PEERWATCH_PEER_DIRS   Comma-separated peer directories
    PEERWATCH_LOG_FORMAT  Log format: text or json (default: text)
    RUST_LOG              Log filter (default: info)

EXAMPLES:
    # Watch a single peer directory
    peerwatch /etc/fastd/vpn/peers

    # Watch directories from the environment, logging as JSON
    PEERWATCH_PEER_DIRS=/etc/fastd/a,/etc/fastd/b PEERWATCH_LOG_FORMAT=json peerwatch
")]
struct Cli {
    /// Peer directories to watch, in addition to PEERWATCH_PEER_DIRS.
    directories: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config =
        Config::from_env_with_dirs(cli.directories).context("Failed to load configuration")?;

    init_logging(config.log_format);

    // Everything runs on one thread; drains never block.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(run_watcher(config))
}

/// Runs the watcher until shutdown or a fatal error.
async fn run_watcher(config: Config) -> Result<()> {
    info!(directories = ?config.peer_dirs, "Starting peerwatch");

    let mut watcher = PeerWatcher::open().context("Failed to initialize inotify")?;

    let watched = watcher.watch_directories(&config.peer_dirs);
    ensure!(watched > 0, "None of the peer directories could be watched");

    info!(watched, "Watcher running. Press Ctrl+C to stop.");

    let mut sink = JsonLinesSink::new(io::stdout());

    host::run_until(&mut watcher, &mut sink, wait_for_shutdown())
        .await
        .context("inotify failed")?;

    info!("Watcher stopped");
    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .with_level(true);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
