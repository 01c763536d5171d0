//! Database facade HTTP server.

use clap::Parser;
use db_facade::cache::CacheClient;
use db_facade::config::Config;
use db_facade::db::{AsyncFacade, AuditLogger};
use db_facade::http::{self, AppState};
use db_facade::logging::init_tracing;
use db_facade::models::ConnectionConfig;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    // Flushes the audit log on drop.
    let _audit_guard = init_tracing(&config)?;

    info!("Starting db-facade v{}", env!("CARGO_PKG_VERSION"));

    let db_config = config.parse_database()?;
    let conn_config = ConnectionConfig::new(db_config.connection_string, db_config.pool_options)?;
    info!(
        db_type = %conn_config.db_type,
        url = %conn_config.masked_connection_string(),
        "Connecting to database"
    );

    let facade = Arc::new(AsyncFacade::connect(&conn_config, AuditLogger::tracing()).await?);

    let cache = match &config.redis_url {
        Some(url) => {
            let client = CacheClient::new(url)?;
            if let Err(e) = client.connect().await {
                // Connection is retried on first use.
                error!(error = %e, "Redis connection failed");
            }
            Some(Arc::new(client))
        }
        None => None,
    };

    let state = AppState::new(facade.clone(), cache.clone());
    let result = http::serve(state, &config.http_bind_addr()).await;

    info!("Closing database connections");
    facade.close().await?;
    if let Some(cache) = cache {
        cache.close().await;
    }

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    Ok(())
}
