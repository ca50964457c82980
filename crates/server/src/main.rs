//! metadata-inventory server entry point.
//!
//! Boots the MCP server on stdio transport. Logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use inventory_client::{FetchClient, FetchConfig};
use inventory_core::{AppConfig, repository};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod service;
#[cfg(test)]
mod testing;
mod tools;

use service::MetadataService;

/// Upper bound on waiting for background fetches at shutdown.
const SHUTDOWN_DRAIN_LIMIT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .init();

    tracing::info!(
        store = ?config.store_backend,
        timeout_s = config.http_timeout,
        max_retries = config.http_max_retries,
        "Starting metadata-inventory server on stdio transport"
    );

    let repo = repository::open(&config).await?;
    let fetcher = FetchClient::new(FetchConfig::from(&config))?;
    let service = MetadataService::from_config(repo, Arc::new(fetcher), &config);

    let handler = handler::MetadataInventoryServer::new(service.clone());
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    let pending = service.in_flight().len();
    if pending > 0 {
        tracing::info!(pending, "waiting for background fetches to finish");
    }
    if !service.in_flight().drain(SHUTDOWN_DRAIN_LIMIT).await {
        tracing::warn!(pending = service.in_flight().len(), "shutting down with background fetches still running");
    }

    Ok(())
}
