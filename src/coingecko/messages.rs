//! CoinGecko wire types

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::common::types::MarketEntry;

/// One row from the provider's `/coins/markets` endpoint
///
/// Numeric fields arrive as JSON numbers and may be null for delisted or
/// thinly traded assets, so everything optional defaults on the way in.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinMarket {
    /// Provider asset identifier (e.g. "bitcoin")
    pub id: String,
    /// Ticker symbol, lowercased by the provider
    #[serde(default)]
    pub symbol: String,
    /// Human-readable asset name
    #[serde(default)]
    pub name: String,
    /// Icon URL
    #[serde(default)]
    pub image: String,
    /// Current price in USD
    #[serde(default)]
    pub current_price: Option<Decimal>,
    /// 24h price change percentage
    #[serde(default)]
    pub price_change_percentage_24h: Option<Decimal>,
    /// Market capitalization in USD
    #[serde(default)]
    pub market_cap: Option<Decimal>,
}

impl CoinMarket {
    /// Convert the provider row into the normalized snapshot entry
    pub fn normalize(self) -> MarketEntry {
        MarketEntry {
            id: self.id,
            name: self.name,
            symbol: self.symbol.to_uppercase(),
            image: self.image,
            price: self.current_price.unwrap_or_default(),
            change_24h: self.price_change_percentage_24h.unwrap_or_default(),
            market_cap: self.market_cap.unwrap_or_default(),
        }
    }
}
