//! term-server - launcher for the terminology web service

use anyhow::{Context, Result};
use sqlx::mysql::MySqlPoolOptions;
use std::time::Duration;
use term_common::logging::{init_logging, LogConfig};
use term_common::shutdown::wait_for_signal;
use term_server::{launch, Config, DatabaseService};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("term-server")
        .filter_directives("sqlx=warn,tower_http=info")
        .build()
        .merge_env()?;
    let _log_guard = init_logging(&log_config)?;

    let config = Config::load()?;
    info!("Configuration loaded");

    let pool = MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .connect(&config.database.url)
        .await
        .with_context(|| format!("Failed to connect to {}", config.database.redacted_url()))?;
    info!("Database connection established");

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    launch(
        DatabaseService::new(pool),
        listener,
        wait_for_signal(),
        Duration::from_secs(config.server.shutdown_timeout_secs),
    )
    .await
}
