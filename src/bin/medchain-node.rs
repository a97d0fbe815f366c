#![forbid(unsafe_code)]
//! MedChain node: ledger, consensus and HTTP API in one process.

use clap::Parser;
use medchain::config::{load_config, load_config_from};
use medchain::node::Node;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "medchain-node", version, about = "Run a MedChain ledger node")]
struct Args {
    /// Path to a TOML config file (defaults to ./config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Interface to bind the HTTP API on
    #[arg(long)]
    host: Option<String>,

    /// Port to bind the HTTP API on
    #[arg(short, long)]
    port: Option<u16>,

    /// Leading zero hex characters required of a proof digest
    #[arg(short, long)]
    difficulty: Option<usize>,

    /// Peer to register at start-up (repeatable)
    #[arg(long = "peer")]
    peers: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    if let Some(host) = args.host {
        config.network.host = host;
    }
    if let Some(port) = args.port {
        config.network.api_port = port;
    }
    if let Some(difficulty) = args.difficulty {
        config.miner.difficulty = difficulty;
    }
    config.network.bootstrap_peers.extend(args.peers);
    config.validate()?;

    let node = Arc::new(Node::new(config)?);
    node.start().await?;

    Ok(())
}
