//! Standalone UDF storage node.
//!
//! # Rust Learning Note
//!
//! A single crate can have both a library AND binaries:
//!
//! ```text
//! udf-node/
//! ├── src/
//! │   ├── lib.rs          ← Library (used by the e2e harness)
//! │   └── bin/
//! │       └── udf-node.rs ← This file (executable)
//! ```
//!
//! Build with: `cargo build --bin udf-node`

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use udf_node::{NodeConfig, NodeServer};

/// UDF storage node
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (YAML)
    #[arg(short, long, value_name = "FILE")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = NodeConfig::load_from_file(&args.config)?;
    if let Some(port) = args.port {
        config.node.port = port;
    }

    initialize_logging(args.debug, &config.node.log_level);

    info!("Starting UDF node {}", config.node.id);
    info!("Config file: {}", args.config);
    info!("Configured with {} peers", config.node.peers.len());

    let server = NodeServer::bind(config.node)
        .await
        .context("Failed to start node")?;

    info!("Press Ctrl+C to stop");
    server.run_until(shutdown_signal()).await?;

    Ok(())
}

fn initialize_logging(debug: bool, configured: &str) {
    let level = if debug { "debug" } else { configured };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_thread_ids(true)
        .init();
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!("Failed to listen for Ctrl+C: {}", e),
    }
}
