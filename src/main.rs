//! CryptotradeCore - Main Entry Point
//!
//! Boots the exchange service over either in-memory or Postgres stores and
//! serves the WebSocket gateway until interrupted.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use cryptotrade_core::coingecko::CoinGeckoRestClient;
use cryptotrade_core::config::{load_config, load_from_env};
use cryptotrade_core::gateway::Gateway;
use cryptotrade_core::market::MarketCache;
use cryptotrade_core::notify::ChannelPublisher;
use cryptotrade_core::service::ExchangeService;
use cryptotrade_core::store::{
    BoxedPortfolioStore, BoxedUserStore, BoxedWalletStore, MemoryStore, PgStore,
};
use cryptotrade_core::trading::{TradeEngine, WalletService};
use cryptotrade_core::users::UserRegistry;

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Port override for the gateway listener
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    // Load configuration from file when one exists, otherwise from the environment
    let config = if Path::new(&args.config).exists() {
        load_config(Some(&args.config))?
    } else {
        load_from_env()?
    };

    // Initialize logging
    let level_name = args
        .log_level
        .as_deref()
        .unwrap_or(&config.settings.log_level);
    let level = match level_name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting {}", config.server.service_name);
    info!("Configuration file: {}", args.config);

    // Stores: Postgres when configured, in-memory otherwise
    let (portfolios, wallets, user_store): (BoxedPortfolioStore, BoxedWalletStore, BoxedUserStore) =
        match &config.database {
            Some(db) => {
                info!("Connecting to database");
                let store = Arc::new(PgStore::connect(db).await?);
                let portfolios: BoxedPortfolioStore = store.clone();
                let wallets: BoxedWalletStore = store.clone();
                let users: BoxedUserStore = store;
                (portfolios, wallets, users)
            }
            None => {
                info!("No database configured, using in-memory stores");
                let store = Arc::new(MemoryStore::new());
                let portfolios: BoxedPortfolioStore = store.clone();
                let wallets: BoxedWalletStore = store.clone();
                let users: BoxedUserStore = store;
                (portfolios, wallets, users)
            }
        };

    // Market data provider behind the snapshot cache
    let source = CoinGeckoRestClient::with_timeout(
        &config.market.base_url,
        Duration::from_secs(config.market.request_timeout_seconds),
    )?
    .with_snapshot_size(config.market.snapshot_size);
    let markets = Arc::new(MarketCache::with_ttl(
        Arc::new(source),
        Duration::from_secs(config.market.cache_ttl_seconds),
    ));

    // Service wiring
    let publisher = Arc::new(ChannelPublisher::new());
    let engine = TradeEngine::new(portfolios.clone(), markets.clone(), &config.trading);
    let wallet = WalletService::new(wallets, portfolios, markets.clone(), &config.trading);
    let users = UserRegistry::new(user_store);
    let service = Arc::new(ExchangeService::new(
        markets,
        engine,
        wallet,
        users,
        publisher.clone(),
        config.server.service_name.clone(),
    ));

    // Gateway listener
    let port = args.port.unwrap_or(config.server.port);
    let bind = format!("{}:{}", config.server.host, port);
    let listener = TcpListener::bind(&bind).await?;

    let gateway = Arc::new(Gateway::new(
        service,
        publisher,
        config.auth.token_secret.clone(),
        Duration::from_secs(config.server.broadcast_interval_seconds),
    ));

    info!("Application initialized successfully");

    tokio::select! {
        result = gateway.serve(listener) => {
            if let Err(err) = result {
                tracing::error!("Gateway stopped: {}", err);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, cleaning up...");
        }
    }

    Ok(())
}
