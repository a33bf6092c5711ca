//! # Server Binary
//!
//! Parses CLI flags, initializes structured logging, binds the listener,
//! and runs until a shutdown signal arrives.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use hkv_server::{NoopObserver, Server, ServerConfig};

#[tokio::main]
async fn main() {
    let config = ServerConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!(addr = %config.bind_addr, "starting server");

    let server = match Server::bind(config, Arc::new(NoopObserver)).await {
        Ok(server) => server,
        Err(err) => {
            tracing::error!(error = %err, "failed to bind listener");
            std::process::exit(1);
        }
    };

    tracing::info!(addr = %server.local_addr(), "listening");

    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to install ctrl-c handler");
    }

    tracing::info!("shutdown signal received");
    server.shutdown().await;
}
