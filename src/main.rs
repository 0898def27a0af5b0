use clap::Parser;
use r2d2::Pool;
use std::sync::Arc;
use tracing::{error, info};

mod config;
mod db;
mod llm;
mod pipeline;
mod schema;
mod util;
mod web;

use crate::config::{AppConfig, CliArgs};
use crate::db::executor::QueryExecutor;
use crate::db::pool::DuckDbConnectionManager;
use crate::llm::client::ChatCompletionClient;
use crate::pipeline::Pipeline;
use crate::schema::SchemaDescriptor;
use crate::util::logging::init_tracing;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_tracing();

    // Parse command line arguments
    let args = CliArgs::parse();

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Resolve the catalog schema; a missing schema is fatal at startup
    let schema = match SchemaDescriptor::from_config(&config.schema) {
        Ok(schema) => schema,
        Err(e) => {
            error!("Failed to resolve schema description: {}", e);
            return Err(e.into());
        }
    };

    info!(
        "Initializing DuckDB connection pool ({})",
        config.database.connection_string
    );
    let db_manager = DuckDbConnectionManager::new(config.database.connection_string.clone());
    let pool = Pool::builder()
        .max_size(config.database.pool_size as u32)
        .build(db_manager)?;
    let executor = QueryExecutor::new(pool);

    info!("Initializing inference client for model: {}", config.llm.model);
    if config.llm.api_key.is_none() {
        info!("No API key configured; searches will fail until one is set");
    }
    let inference_client = ChatCompletionClient::new(&config.llm)?;

    let pipeline = Pipeline::new(
        schema.clone(),
        Box::new(inference_client),
        Box::new(executor),
    );

    let app_state = Arc::new(AppState::new(
        config.clone(),
        pipeline,
        schema.text().to_string(),
    ));

    // Start the web server
    info!(
        "Starting partsearch server on {}:{}",
        config.web.host, config.web.port
    );
    match web::run_server(config.web, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(std::io::Error::other(e.to_string()).into());
        }
    }

    Ok(())
}
