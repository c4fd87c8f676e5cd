//! Process-wide market snapshot cache
//!
//! One full snapshot is cached and refreshed wholesale once it is older
//! than the freshness window. Provider failures degrade to serving the
//! stale snapshot; an error only surfaces when no snapshot has ever been
//! populated. Pagination slices the cached list in memory, so the provider
//! is never queried per page.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::BoxedMarketDataSource;
use crate::common::errors::{ExchangeError, Result};
use crate::common::types::MarketEntry;

/// Default freshness window for the cached snapshot
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

/// Largest page the provider (and therefore pagination) supports
pub const MAX_PER_PAGE: u32 = 250;

/// Page size used when the caller does not pass one
pub const DEFAULT_PER_PAGE: u32 = 100;

/// Case-insensitive symbol lookup over a snapshot slice
pub fn find_symbol<'a>(entries: &'a [MarketEntry], symbol: &str) -> Option<&'a MarketEntry> {
    let wanted = symbol.trim().to_uppercase();
    entries.iter().find(|entry| entry.symbol == wanted)
}

struct CacheState {
    entries: Arc<Vec<MarketEntry>>,
    fetched_at: Option<Instant>,
}

/// Shared market snapshot cache with an injected provider source
pub struct MarketCache {
    source: BoxedMarketDataSource,
    ttl: Duration,
    state: RwLock<CacheState>,
}

impl MarketCache {
    /// Create a cache with the default freshness window
    pub fn new(source: BoxedMarketDataSource) -> Self {
        Self::with_ttl(source, DEFAULT_CACHE_TTL)
    }

    /// Create a cache with a custom freshness window
    pub fn with_ttl(source: BoxedMarketDataSource, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            state: RwLock::new(CacheState {
                entries: Arc::new(Vec::new()),
                fetched_at: None,
            }),
        }
    }

    /// Full cached snapshot, refreshed first when stale
    pub async fn snapshot(&self) -> Result<Arc<Vec<MarketEntry>>> {
        {
            let state = self.state.read().await;
            let fresh = !state.entries.is_empty()
                && state
                    .fetched_at
                    .map(|at| at.elapsed() < self.ttl)
                    .unwrap_or(false);
            if fresh {
                return Ok(state.entries.clone());
            }
        }

        match self.source.fetch_markets().await {
            Ok(entries) => {
                debug!("Market snapshot refreshed with {} entries", entries.len());
                let entries = Arc::new(entries);
                let mut state = self.state.write().await;
                state.entries = entries.clone();
                state.fetched_at = Some(Instant::now());
                Ok(entries)
            }
            Err(err) => {
                let state = self.state.read().await;
                if !state.entries.is_empty() {
                    warn!("Market refresh failed, serving stale snapshot: {}", err);
                    return Ok(state.entries.clone());
                }
                Err(match err {
                    unavailable @ ExchangeError::UpstreamUnavailable(_) => unavailable,
                    other => ExchangeError::UpstreamUnavailable(other.to_string()),
                })
            }
        }
    }

    /// One page of the snapshot, sliced in memory
    ///
    /// `per_page` clamps to [1, 250] with a default of 100; `page` defaults
    /// to 1. Pages past the end come back empty.
    pub async fn page(&self, page: Option<u32>, per_page: Option<u32>) -> Result<Vec<MarketEntry>> {
        let per_page = per_page
            .filter(|&v| v > 0)
            .unwrap_or(DEFAULT_PER_PAGE)
            .min(MAX_PER_PAGE) as usize;
        let page = page.filter(|&v| v > 0).unwrap_or(1) as usize;

        let entries = self.snapshot().await?;
        let start = (page - 1) * per_page;
        Ok(entries.iter().skip(start).take(per_page).cloned().collect())
    }

    /// Case-insensitive lookup against the (refreshed) snapshot
    pub async fn find(&self, symbol: &str) -> Result<Option<MarketEntry>> {
        let entries = self.snapshot().await?;
        Ok(find_symbol(&entries, symbol).cloned())
    }
}
