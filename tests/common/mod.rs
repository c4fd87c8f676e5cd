//! Common test utilities and fixtures

// not every suite uses every helper
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use cryptotrade_core::common::errors::Result;
use cryptotrade_core::common::types::MarketEntry;
use cryptotrade_core::config::types::TradingConfig;
use cryptotrade_core::market::{MarketCache, MarketDataSource};
use cryptotrade_core::notify::ChannelPublisher;
use cryptotrade_core::service::ExchangeService;
use cryptotrade_core::store::MemoryStore;
use cryptotrade_core::trading::{TradeEngine, WalletService};
use cryptotrade_core::users::UserRegistry;

/// Create one market entry for testing
pub fn market_entry(id: &str, name: &str, symbol: &str, price: Decimal) -> MarketEntry {
    MarketEntry {
        id: id.to_string(),
        name: name.to_string(),
        symbol: symbol.to_string(),
        image: String::new(),
        price,
        change_24h: dec!(0),
        market_cap: dec!(0),
    }
}

/// Market snapshot used across the integration suites
pub fn sample_markets() -> Vec<MarketEntry> {
    vec![
        market_entry("bitcoin", "Bitcoin", "BTC", dec!(50000)),
        market_entry("ethereum", "Ethereum", "ETH", dec!(3000)),
        market_entry("dogecoin", "Dogecoin", "DOGE", dec!(0.1)),
    ]
}

/// Market source serving a mutable in-memory snapshot
pub struct SharedSource {
    entries: Mutex<Vec<MarketEntry>>,
}

impl SharedSource {
    pub fn new(entries: Vec<MarketEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Reprice one symbol for the next fetch
    pub fn set_price(&self, symbol: &str, price: Decimal) {
        let mut entries = self.entries.lock().unwrap();
        for entry in entries.iter_mut() {
            if entry.symbol == symbol {
                entry.price = price;
            }
        }
    }
}

#[async_trait]
impl MarketDataSource for SharedSource {
    async fn fetch_markets(&self) -> Result<Vec<MarketEntry>> {
        Ok(self.entries.lock().unwrap().clone())
    }
}

/// Fully wired service over in-memory stores and a `SharedSource`
pub struct TestHarness {
    pub service: Arc<ExchangeService>,
    pub publisher: Arc<ChannelPublisher>,
    pub source: Arc<SharedSource>,
    pub store: Arc<MemoryStore>,
}

/// Build a harness with the default 100k of demo cash
pub fn build_service(markets: Vec<MarketEntry>) -> TestHarness {
    build_service_with_cash(markets, dec!(100000))
}

/// Build a harness with a custom demo starting balance
pub fn build_service_with_cash(markets: Vec<MarketEntry>, demo_cash: Decimal) -> TestHarness {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(SharedSource::new(markets));
    // zero TTL so repriced sources are picked up on the next call
    let cache = Arc::new(MarketCache::with_ttl(source.clone(), Duration::ZERO));
    let publisher = Arc::new(ChannelPublisher::new());
    let trading = TradingConfig {
        demo_starting_cash: demo_cash,
        ..TradingConfig::default()
    };

    let engine = TradeEngine::new(store.clone(), cache.clone(), &trading);
    let wallet = WalletService::new(store.clone(), store.clone(), cache.clone(), &trading);
    let users = UserRegistry::new(store.clone());

    let service = Arc::new(ExchangeService::new(
        cache,
        engine,
        wallet,
        users,
        publisher.clone(),
        "cryptotrade-core-test".to_string(),
    ));

    TestHarness {
        service,
        publisher,
        source,
        store,
    }
}

/// Sample provider responses for wiremock-backed tests
pub mod api_responses {
    /// Two-coin `/coins/markets` payload
    pub const MARKETS: &str = r#"[
        {
            "id": "bitcoin",
            "symbol": "btc",
            "name": "Bitcoin",
            "image": "https://assets.example/btc.png",
            "current_price": 50000.0,
            "market_cap": 980000000000,
            "price_change_percentage_24h": 2.5
        },
        {
            "id": "ethereum",
            "symbol": "eth",
            "name": "Ethereum",
            "image": "https://assets.example/eth.png",
            "current_price": 3000.0,
            "market_cap": 360000000000,
            "price_change_percentage_24h": -1.2
        }
    ]"#;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_markets_fixture() {
        let markets = sample_markets();
        assert_eq!(markets.len(), 3);
        assert_eq!(markets[0].symbol, "BTC");
        assert_eq!(markets[0].price, dec!(50000));
    }

    #[test]
    fn test_shared_source_reprices() {
        let source = SharedSource::new(sample_markets());
        source.set_price("BTC", dec!(60000));
        let entries = source.entries.lock().unwrap();
        assert_eq!(entries[0].price, dec!(60000));
    }
}
