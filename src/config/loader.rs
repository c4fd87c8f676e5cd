//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::{AppConfig, DatabaseConfig};
use crate::common::errors::{ExchangeError, Result};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with CRYPTOTRADE_)
/// 2. Configuration file (TOML format)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    // Add default config file if it exists
    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    // Add environment variables with CRYPTOTRADE_ prefix
    builder = builder.add_source(
        Environment::with_prefix("CRYPTOTRADE")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ExchangeError::Configuration(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ExchangeError::Configuration(e.to_string()))
}

/// Load configuration from environment variables only
///
/// Honors the short variable names the deployment scripts already use
/// (PORT, TOKEN_SECRET, DATABASE_URL) on top of the defaults.
pub fn load_from_env() -> Result<AppConfig> {
    // Try to load from .env file
    dotenvy::dotenv().ok();

    let mut config = AppConfig::default();

    if let Ok(port) = std::env::var("PORT") {
        config.server.port = port
            .parse()
            .map_err(|_| ExchangeError::Configuration(format!("invalid PORT value: {}", port)))?;
    }

    if let Ok(secret) = std::env::var("TOKEN_SECRET") {
        config.auth.token_secret = secret;
    }

    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.database = Some(DatabaseConfig {
            url,
            max_connections: 5,
            connection_timeout_seconds: 30,
        });
    }

    if let Ok(base_url) = std::env::var("COINGECKO_BASE_URL") {
        config.market.base_url = base_url;
    }

    Ok(config)
}
