//! Configuration validation
//!
//! Validates critical configuration values at startup to catch misconfigurations early.

use anyhow::{anyhow, Result};
use deckforge_core::Config;

use crate::constants::MIN_MASTER_API_KEY_LEN;

pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    if config.is_production() && config.cors_origins.iter().any(|o| o == "*") {
        return Err(anyhow!(
            "CORS configured to allow all origins (*) in production. \
            Set specific allowed origins via the CORS_ORIGINS environment variable."
        ));
    }

    if config.allow_private_urls {
        tracing::warn!("ALLOW_PRIVATE_URLS is set - sources on internal addresses will be fetched");
    }

    tracing::info!("Configuration validation passed");
    Ok(())
}

/// Read `MASTER_API_KEY`, which protects the generation endpoint.
pub fn master_api_key() -> Result<String> {
    let key = std::env::var("MASTER_API_KEY")
        .map_err(|_| anyhow!("MASTER_API_KEY environment variable not set"))?;
    check_master_api_key(&key)?;
    Ok(key)
}

pub fn check_master_api_key(key: &str) -> Result<()> {
    if key.len() < MIN_MASTER_API_KEY_LEN {
        return Err(anyhow!(
            "MASTER_API_KEY must be at least {} characters long",
            MIN_MASTER_API_KEY_LEN
        ));
    }
    Ok(())
}
