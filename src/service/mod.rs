//! High-level exchange service facade
//!
//! Wires the market cache, trade engine, wallet service, user registry and
//! publisher into the surface the gateway and embedding applications call.
//! Quantities cross this boundary as `f64` and are converted to decimals
//! before any arithmetic; non-finite values are rejected here. Mutations
//! publish their updated projections after commit, and a publish failure
//! is logged, never propagated.

use std::sync::Arc;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::common::errors::{ExchangeError, Result};
use crate::common::types::{now_millis, MarketEntry, Portfolio, TradeMode};
use crate::market::MarketCache;
use crate::notify::{BoxedPublisher, PortfolioUpdate, UserEvent};
use crate::trading::{
    DepositOutcome, PortfolioView, TradeEngine, TradeOutcome, WalletService, WalletSummary,
};
use crate::users::UserRegistry;

/// Liveness payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub ok: bool,
    pub service: String,
    pub ts: i64,
}

pub struct ExchangeService {
    markets: Arc<MarketCache>,
    engine: TradeEngine,
    wallet: WalletService,
    users: UserRegistry,
    publisher: BoxedPublisher,
    service_name: String,
}

impl ExchangeService {
    pub fn new(
        markets: Arc<MarketCache>,
        engine: TradeEngine,
        wallet: WalletService,
        users: UserRegistry,
        publisher: BoxedPublisher,
        service_name: String,
    ) -> Self {
        Self {
            markets,
            engine,
            wallet,
            users,
            publisher,
            service_name,
        }
    }

    /// One page of the market snapshot
    pub async fn markets(&self, page: Option<u32>, per_page: Option<u32>) -> Result<Vec<MarketEntry>> {
        self.markets.page(page, per_page).await
    }

    /// Case-insensitive lookup of one market entry
    pub async fn find_market(&self, symbol: &str) -> Result<Option<MarketEntry>> {
        self.markets.find(symbol).await
    }

    /// Portfolio snapshot, creating the portfolio on first access
    #[instrument(skip(self))]
    pub async fn portfolio(&self, user_id: &str, mode: &str) -> Result<PortfolioView> {
        let mode = TradeMode::normalize(mode);
        self.engine.view(user_id, mode).await
    }

    /// Execute a buy and push the updated snapshot to the user's lane
    #[instrument(skip(self))]
    pub async fn buy(
        &self,
        user_id: &str,
        mode: &str,
        symbol: &str,
        qty: f64,
    ) -> Result<TradeOutcome> {
        let mode = TradeMode::normalize(mode);
        let qty = trade_qty(symbol, qty)?;
        let portfolio = self.engine.buy(user_id, mode, symbol, qty).await?;
        let view = self.project(&portfolio).await?;
        self.push_portfolio(user_id, mode, view.clone()).await;
        Ok(TradeOutcome {
            message: "Buy executed".to_string(),
            portfolio: view,
        })
    }

    /// Execute a sell and push the updated snapshot to the user's lane
    #[instrument(skip(self))]
    pub async fn sell(
        &self,
        user_id: &str,
        mode: &str,
        symbol: &str,
        qty: f64,
    ) -> Result<TradeOutcome> {
        let mode = TradeMode::normalize(mode);
        let qty = trade_qty(symbol, qty)?;
        let portfolio = self.engine.sell(user_id, mode, symbol, qty).await?;
        let view = self.project(&portfolio).await?;
        self.push_portfolio(user_id, mode, view.clone()).await;
        Ok(TradeOutcome {
            message: "Sell executed".to_string(),
            portfolio: view,
        })
    }

    /// Wallet balances priced against the current snapshot
    pub async fn wallet_summary(&self, user_id: &str) -> Result<WalletSummary> {
        self.wallet.summary(user_id).await
    }

    /// Simulated card deposit
    #[instrument(skip(self))]
    pub async fn deposit_card(
        &self,
        user_id: &str,
        amount_usd: f64,
        reference: Option<&str>,
    ) -> Result<DepositOutcome> {
        let amount = to_positive_decimal(amount_usd, "amountUSD (>0) required")?;
        let wallet = self.wallet.deposit_card(user_id, amount, reference).await?;
        self.push_wallet(user_id).await;
        Ok(DepositOutcome {
            message: "Deposit successful".to_string(),
            usd: Some(wallet.usd),
        })
    }

    /// Simulated on-chain deposit
    #[instrument(skip(self))]
    pub async fn deposit_crypto(
        &self,
        user_id: &str,
        symbol: &str,
        qty: f64,
        tx_hash: Option<&str>,
    ) -> Result<DepositOutcome> {
        let qty = to_positive_decimal(qty, "qty (>0) required")?;
        self.wallet.deposit_crypto(user_id, symbol, qty, tx_hash).await?;
        self.push_wallet(user_id).await;
        Ok(DepositOutcome {
            message: "Crypto deposit successful".to_string(),
            usd: None,
        })
    }

    /// Registry for user records
    pub fn users(&self) -> &UserRegistry {
        &self.users
    }

    /// Liveness report
    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            ok: true,
            service: self.service_name.clone(),
            ts: now_millis(),
        }
    }

    async fn project(&self, portfolio: &Portfolio) -> Result<PortfolioView> {
        let markets = self.markets.snapshot().await?;
        Ok(PortfolioView::project(portfolio, &markets))
    }

    async fn push_portfolio(&self, user_id: &str, mode: TradeMode, portfolio: PortfolioView) {
        let event = UserEvent::Portfolio(PortfolioUpdate { mode, portfolio });
        if let Err(err) = self.publisher.publish(user_id, event).await {
            warn!("Portfolio notify for {} failed: {}", user_id, err);
        }
    }

    async fn push_wallet(&self, user_id: &str) {
        match self.wallet.summary(user_id).await {
            Ok(summary) => {
                if let Err(err) = self.publisher.publish(user_id, UserEvent::Wallet(summary)).await {
                    warn!("Wallet notify for {} failed: {}", user_id, err);
                }
            }
            Err(err) => warn!("Wallet projection for notify failed: {}", err),
        }
    }
}

fn trade_qty(symbol: &str, qty: f64) -> Result<Decimal> {
    if symbol.trim().is_empty() {
        return Err(ExchangeError::InvalidAmount(
            "symbol and qty (>0) required".to_string(),
        ));
    }
    to_positive_decimal(qty, "symbol and qty (>0) required")
}

fn to_positive_decimal(value: f64, message: &str) -> Result<Decimal> {
    Decimal::from_f64(value)
        .filter(|decimal| *decimal > Decimal::ZERO)
        .ok_or_else(|| ExchangeError::InvalidAmount(message.to_string()))
}
