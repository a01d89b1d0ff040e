// Fetch service binary
//
// Serves fetch, discovery, site mapping and document capture over HTTP/JSON.
// Configuration comes from PAGEFETCH_* environment variables; log filtering
// from RUST_LOG (default: info).

use anyhow::{Context, Result};
use kodegen_tools_pagefetch::{ServiceConfig, ServiceContext, server};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl-C received; draining connections"),
        Err(e) => warn!("Failed to listen for Ctrl-C ({e}); serving until killed"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServiceConfig::from_env().context("Failed to read configuration")?;

    let service = Arc::new(ServiceContext::new(config).context("Failed to build service")?);
    server::serve(service, shutdown_signal()).await?;

    info!("Shutdown complete");
    Ok(())
}
