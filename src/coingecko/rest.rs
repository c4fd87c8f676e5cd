//! REST client for the CoinGecko markets API

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

use super::messages::CoinMarket;
use crate::common::errors::{ExchangeError, Result};
use crate::common::types::MarketEntry;
use crate::market::MarketDataSource;

/// REST client for the CoinGecko markets API
#[derive(Debug, Clone)]
pub struct CoinGeckoRestClient {
    /// HTTP client
    client: Client,
    /// Base URL for the API
    base_url: String,
    /// Entries requested per refresh (provider maximum is 250)
    snapshot_size: u32,
}

impl CoinGeckoRestClient {
    /// Create a new client with the default timeout
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(10))
    }

    /// Create a new client with a custom request timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExchangeError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            snapshot_size: 250,
        })
    }

    /// Override the number of entries fetched per refresh
    pub fn with_snapshot_size(mut self, snapshot_size: u32) -> Self {
        self.snapshot_size = snapshot_size.clamp(1, 250);
        self
    }

    /// Fetch one full page of markets ordered by market cap
    #[instrument(skip(self))]
    pub async fn markets(&self) -> Result<Vec<CoinMarket>> {
        let url = format!(
            "{}/coins/markets?vs_currency=usd&order=market_cap_desc&per_page={}&page=1&sparkline=false&price_change_percentage=24h",
            self.base_url, self.snapshot_size
        );
        debug!("Fetching markets from: {}", url);

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::UpstreamUnavailable(format!(
                "provider returned status {}: {}",
                status, body
            )));
        }

        let rows: Vec<CoinMarket> = response.json().await?;
        Ok(rows)
    }
}

#[async_trait]
impl MarketDataSource for CoinGeckoRestClient {
    async fn fetch_markets(&self) -> Result<Vec<MarketEntry>> {
        let rows = self.markets().await?;
        Ok(rows.into_iter().map(CoinMarket::normalize).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = CoinGeckoRestClient::new("https://api.coingecko.com/api/v3");
        assert!(client.is_ok());
    }

    #[test]
    fn test_url_normalization() {
        let client = CoinGeckoRestClient::new("https://api.coingecko.com/api/v3/").unwrap();
        assert!(!client.base_url.ends_with('/'));
    }

    #[test]
    fn test_snapshot_size_clamped() {
        let client = CoinGeckoRestClient::new("https://api.coingecko.com/api/v3")
            .unwrap()
            .with_snapshot_size(9000);
        assert_eq!(client.snapshot_size, 250);
    }
}
