//! Application setup and initialization

pub mod routes;
pub mod server;
pub mod services;
pub mod validation;

use std::sync::Arc;

use anyhow::{Context, Result};
use deckforge_core::Config;

use crate::state::AppState;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(&config.environment)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    // Fail fast on misconfiguration
    validation::validate_config(&config).context("Configuration validation failed")?;
    let master_api_key = validation::master_api_key()?;
    tracing::info!("Configuration loaded and validated successfully");

    let state = services::initialize_services(&config)?;
    let router = routes::setup_routes(&config, state.clone(), master_api_key)?;

    Ok((state, router))
}
