//! CryptotradeCore Library
//!
//! Trade execution and portfolio accounting core for a simulated
//! cryptocurrency exchange: per-user DEMO and REAL portfolios, a shared
//! market snapshot cache, simulated deposits and realtime fan-out.

pub mod coingecko;
pub mod common;
pub mod config;
pub mod gateway;
pub mod market;
pub mod notify;
pub mod service;
pub mod store;
pub mod trading;
pub mod users;

// Re-export commonly used types
pub use common::errors::{ExchangeError, Result};
pub use common::types::{
    DepositKind, Holding, MarketEntry, Portfolio, TradeMode, TradeRecord, TradeSide, Wallet,
    WalletAsset, WalletTransaction,
};
pub use coingecko::CoinGeckoRestClient;
pub use config::types::AppConfig;
pub use gateway::Gateway;
pub use market::{BoxedMarketDataSource, MarketCache, MarketDataSource};
pub use notify::{BoxedPublisher, ChannelPublisher, Publisher, UserEvent};
pub use service::{ExchangeService, HealthStatus};
pub use store::{
    BoxedPortfolioStore, BoxedUserStore, BoxedWalletStore, MemoryStore, PgStore, PortfolioStore,
    UserStore, WalletStore,
};
pub use users::{User, UserRegistry};

// Trading types
pub use trading::{
    DepositOutcome, HoldingView, PortfolioView, TradeEngine, TradeOutcome, WalletAssetView,
    WalletService, WalletSummary,
};
