//! Trade execution against the portfolio store

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::common::errors::{ExchangeError, Result};
use crate::common::types::{
    now_millis, round_qty, round_usd, Portfolio, TradeMode, TradeRecord, TradeSide,
};
use crate::config::types::TradingConfig;
use crate::market::{find_symbol, MarketCache};
use crate::store::BoxedPortfolioStore;
use crate::trading::types::PortfolioView;

/// Single mutation path for portfolio cash and holdings.
///
/// Every operation reads the portfolio, validates against the current
/// snapshot price, applies the mutation and writes back with a
/// compare-and-swap. A lost version race re-runs the whole operation from
/// the read, a bounded number of times, before surfacing the conflict.
pub struct TradeEngine {
    portfolios: BoxedPortfolioStore,
    markets: Arc<MarketCache>,
    demo_starting_cash: Decimal,
    max_retries: u32,
}

impl TradeEngine {
    pub fn new(
        portfolios: BoxedPortfolioStore,
        markets: Arc<MarketCache>,
        config: &TradingConfig,
    ) -> Self {
        Self {
            portfolios,
            markets,
            demo_starting_cash: config.demo_starting_cash,
            max_retries: config.max_conflict_retries,
        }
    }

    fn starting_cash(&self, mode: TradeMode) -> Decimal {
        match mode {
            TradeMode::Demo => self.demo_starting_cash,
            TradeMode::Real => Decimal::ZERO,
        }
    }

    /// Existing portfolio for (user, mode), or a freshly seeded one
    pub async fn get_or_create(&self, user_id: &str, mode: TradeMode) -> Result<Portfolio> {
        self.portfolios
            .find_or_create(user_id, mode, self.starting_cash(mode))
            .await
    }

    /// Portfolio projected against the current snapshot
    #[instrument(skip(self))]
    pub async fn view(&self, user_id: &str, mode: TradeMode) -> Result<PortfolioView> {
        let markets = self.markets.snapshot().await?;
        let portfolio = self.get_or_create(user_id, mode).await?;
        Ok(PortfolioView::project(&portfolio, &markets))
    }

    /// Execute a buy at the current snapshot price
    #[instrument(skip(self))]
    pub async fn buy(
        &self,
        user_id: &str,
        mode: TradeMode,
        symbol: &str,
        qty: Decimal,
    ) -> Result<Portfolio> {
        ensure_positive_qty(qty)?;

        let markets = self.markets.snapshot().await?;
        let entry = find_symbol(&markets, symbol)
            .ok_or_else(|| ExchangeError::UnknownAsset(symbol.trim().to_uppercase()))?;

        let cost = round_usd(qty * entry.price);
        let mut attempts = 0;
        loop {
            let mut portfolio = self.get_or_create(user_id, mode).await?;
            if portfolio.cash_usd < cost {
                return Err(ExchangeError::InsufficientCash {
                    required: cost,
                    available: portfolio.cash_usd,
                });
            }

            portfolio.merge_holding(&entry.symbol, &entry.name, qty, entry.price);
            portfolio.cash_usd = round_usd(portfolio.cash_usd - cost);
            portfolio.trades.insert(
                0,
                TradeRecord {
                    side: TradeSide::Buy,
                    symbol: entry.symbol.clone(),
                    qty: round_qty(qty),
                    price: entry.price,
                    total: cost,
                    ts: now_millis(),
                },
            );

            match self.portfolios.update(&portfolio).await {
                Ok(saved) => {
                    debug!(user_id, %mode, symbol = %entry.symbol, %cost, "buy committed");
                    return Ok(saved);
                }
                Err(err) if err.is_conflict() && attempts < self.max_retries => {
                    attempts += 1;
                    debug!(user_id, attempts, "buy lost a version race, retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Execute a sell at the current snapshot price
    #[instrument(skip(self))]
    pub async fn sell(
        &self,
        user_id: &str,
        mode: TradeMode,
        symbol: &str,
        qty: Decimal,
    ) -> Result<Portfolio> {
        ensure_positive_qty(qty)?;

        let markets = self.markets.snapshot().await?;
        let entry = find_symbol(&markets, symbol)
            .ok_or_else(|| ExchangeError::UnknownAsset(symbol.trim().to_uppercase()))?;

        let proceeds = round_usd(qty * entry.price);
        let mut attempts = 0;
        loop {
            let mut portfolio = self.get_or_create(user_id, mode).await?;
            let held = portfolio
                .holding(&entry.symbol)
                .map(|h| h.qty)
                .unwrap_or(Decimal::ZERO);
            if held < qty {
                return Err(ExchangeError::InsufficientHoldings {
                    symbol: entry.symbol.clone(),
                    required: qty,
                    available: held,
                });
            }

            portfolio.reduce_holding(&entry.symbol, qty);
            portfolio.cash_usd = round_usd(portfolio.cash_usd + proceeds);
            portfolio.trades.insert(
                0,
                TradeRecord {
                    side: TradeSide::Sell,
                    symbol: entry.symbol.clone(),
                    qty: round_qty(qty),
                    price: entry.price,
                    total: proceeds,
                    ts: now_millis(),
                },
            );

            match self.portfolios.update(&portfolio).await {
                Ok(saved) => {
                    debug!(user_id, %mode, symbol = %entry.symbol, %proceeds, "sell committed");
                    return Ok(saved);
                }
                Err(err) if err.is_conflict() && attempts < self.max_retries => {
                    attempts += 1;
                    debug!(user_id, attempts, "sell lost a version race, retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn ensure_positive_qty(qty: Decimal) -> Result<()> {
    if qty <= Decimal::ZERO {
        return Err(ExchangeError::InvalidAmount(
            "symbol and qty (>0) required".to_string(),
        ));
    }
    Ok(())
}
