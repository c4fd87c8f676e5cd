//! Configuration types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gateway server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Market data provider settings
    #[serde(default)]
    pub market: MarketConfig,
    /// Trading engine settings
    #[serde(default)]
    pub trading: TradingConfig,
    /// Gateway token settings
    #[serde(default)]
    pub auth: AuthConfig,
    /// Database configuration (absent = in-memory stores)
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            market: MarketConfig::default(),
            trading: TradingConfig::default(),
            auth: AuthConfig::default(),
            database: None,
            settings: AppSettings::default(),
        }
    }
}

/// Gateway server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind the websocket gateway on
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind the websocket gateway on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Service name reported by the health probe
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Seconds between public market broadcasts
    #[serde(default = "default_broadcast_interval")]
    pub broadcast_interval_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            service_name: default_service_name(),
            broadcast_interval_seconds: default_broadcast_interval(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_service_name() -> String {
    "cryptotrade-core".to_string()
}

fn default_broadcast_interval() -> u64 {
    5
}

/// Market data provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Base URL of the market data provider API
    #[serde(default = "default_market_base_url")]
    pub base_url: String,
    /// Seconds a cached snapshot is considered fresh
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Entries fetched per refresh (the provider maximum)
    #[serde(default = "default_snapshot_size")]
    pub snapshot_size: u32,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_url: default_market_base_url(),
            cache_ttl_seconds: default_cache_ttl(),
            request_timeout_seconds: default_request_timeout(),
            snapshot_size: default_snapshot_size(),
        }
    }
}

fn default_market_base_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_cache_ttl() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    10
}

fn default_snapshot_size() -> u32 {
    250
}

/// Trading engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Starting cash for freshly created DEMO portfolios
    #[serde(default = "default_demo_starting_cash")]
    pub demo_starting_cash: Decimal,
    /// Times a lost version race is retried before surfacing a conflict
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            demo_starting_cash: default_demo_starting_cash(),
            max_conflict_retries: default_max_conflict_retries(),
        }
    }
}

fn default_demo_starting_cash() -> Decimal {
    Decimal::from(100_000)
}

fn default_max_conflict_retries() -> u32 {
    3
}

/// Gateway token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared secret for gateway token signatures
    #[serde(default = "default_token_secret")]
    pub token_secret: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: default_token_secret(),
        }
    }
}

fn default_token_secret() -> String {
    "dev-secret-change-me".to_string()
}

/// Database configuration for the persistent stores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_connection_timeout() -> u64 {
    30
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
