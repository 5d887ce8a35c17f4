//! SPR Server - Main entry point

use anyhow::Result;
use spr_common::logging::{init_logging, LogConfig};
use spr_server::config::Config;
use spr_store::LookupStore;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .log_file_prefix("spr-server".to_string())
        .filter_directives("spr_server=debug,tower_http=debug,axum=trace".to_string())
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    info!("Starting SPR Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let store = LookupStore::open(&config.store)?;
    info!("Lookup store opened at {}", config.store.path.display());

    spr_server::api::serve(config, store).await?;

    info!("Server shut down gracefully");

    Ok(())
}
