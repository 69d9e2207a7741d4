//! Model server binary
//!
//! Thin bootstrap around [`ModelServer`]: parse the CLI, layer
//! configuration, serve until interrupted. Model implementations are
//! registered by embedding applications through the library API; a plain
//! binary start serves the health and admin surfaces with an empty
//! repository.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use model_server::{ModelServer, ServerConfig};

/// Multi-protocol model inference server
#[derive(Debug, Parser)]
#[command(name = "model-server", version, about)]
struct Args {
    /// Path to a JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listening port for the HTTP protocol surface
    #[arg(long)]
    port: Option<u16>,

    /// Number of worker threads for blocking model calls
    #[arg(long)]
    workers: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init()?;

    let args = Args::parse();

    let mut config = ServerConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(workers) = args.workers {
        config.worker_pool_size = workers;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        config.request_timeout_secs = timeout_secs;
    }
    config.validate()?;

    let server = ModelServer::new(config)?;
    server.start().await?;

    info!("Model server is running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;

    server.stop().await?;

    Ok(())
}
