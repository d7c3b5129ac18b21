mod config;
mod db;
mod error;
mod prompts;
mod resources;
mod sample;
mod server;
mod tools;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Logs go to stderr or the configured file; stdout carries the protocol.
fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sqlite_mcp=info,rmcp=info"));
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);

    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false);
            if use_json {
                registry.with(layer.json()).init();
            } else {
                registry.with(layer).init();
            }
        }
        None => {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false);
            if use_json {
                registry.with(layer.json()).init();
            } else {
                registry.with(layer).init();
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(&config)?;

    if config.create_sample {
        let path = config.database_path();
        let rows = sample::create_sample_database(&path)
            .with_context(|| format!("Failed to create sample database at {}", path.display()))?;
        tracing::info!(rows, path = %path.display(), "Sample database ready");
        return Ok(());
    }

    tracing::info!(db_path = %config.database_path().display(), "Starting sqlite-mcp server");

    // Run the server
    server::run(&config).await
}
