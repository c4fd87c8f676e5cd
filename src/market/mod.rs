//! Market module - shared price snapshot cache

pub mod cache;

use std::sync::Arc;

use async_trait::async_trait;

use crate::common::errors::Result;
use crate::common::types::MarketEntry;

/// Provider seam for the market cache
///
/// Implementations fetch one full normalized market list per call. The
/// cache decides when to call and how to degrade on failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch the full normalized market list from the provider
    async fn fetch_markets(&self) -> Result<Vec<MarketEntry>>;
}

/// Shared handle for an injected market data source
pub type BoxedMarketDataSource = Arc<dyn MarketDataSource>;

pub use cache::{find_symbol, MarketCache};
