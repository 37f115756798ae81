use anyhow::{Context, Result};
use catalog_api::config::AppConfig;
use catalog_api::server;
use catalog_api::storage::MongoConnector;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "catalog_api=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    tracing::info!(database = %config.mongo.database_name, "starting catalog API");

    let connector = Arc::new(MongoConnector::from_config(&config.mongo));
    server::serve(&config.server, connector).await
}
