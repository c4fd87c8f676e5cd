//! Simulated deposits and the wallet summary
//!
//! Deposits are the only code path that writes the wallet and the REAL
//! portfolio together. A card deposit syncs the REAL cash balance to the
//! wallet's new USD total absolutely; a crypto deposit merges the received
//! quantity into REAL holdings at the current snapshot price using the
//! same weighted-average rule as a buy.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::instrument;

use crate::common::errors::{ExchangeError, Result};
use crate::common::types::{
    now_millis, round_qty, round_usd, DepositKind, Portfolio, TradeMode, Wallet,
    WalletTransaction,
};
use crate::config::types::TradingConfig;
use crate::market::MarketCache;
use crate::store::{BoxedPortfolioStore, BoxedWalletStore};
use crate::trading::types::WalletSummary;

/// Longest reference kept on a transaction record
pub const REFERENCE_MAX_LEN: usize = 64;

pub struct WalletService {
    wallets: BoxedWalletStore,
    portfolios: BoxedPortfolioStore,
    markets: Arc<MarketCache>,
    max_retries: u32,
}

impl WalletService {
    pub fn new(
        wallets: BoxedWalletStore,
        portfolios: BoxedPortfolioStore,
        markets: Arc<MarketCache>,
        config: &TradingConfig,
    ) -> Self {
        Self {
            wallets,
            portfolios,
            markets,
            max_retries: config.max_conflict_retries,
        }
    }

    /// Wallet balances priced against the current snapshot
    pub async fn summary(&self, user_id: &str) -> Result<WalletSummary> {
        let markets = self.markets.snapshot().await?;
        let wallet = self.wallets.find_or_create(user_id).await?;
        Ok(WalletSummary::project(&wallet, &markets))
    }

    /// Simulated card deposit crediting the wallet's USD balance
    #[instrument(skip(self))]
    pub async fn deposit_card(
        &self,
        user_id: &str,
        amount: Decimal,
        reference: Option<&str>,
    ) -> Result<Wallet> {
        if amount <= Decimal::ZERO {
            return Err(ExchangeError::InvalidAmount(
                "amountUSD (>0) required".to_string(),
            ));
        }
        let amount = round_usd(amount);
        let reference = clean_reference(reference, "CARD");

        let wallet = self
            .mutate_wallet(user_id, |wallet| {
                wallet.usd = round_usd(wallet.usd + amount);
                wallet.transactions.insert(
                    0,
                    WalletTransaction {
                        kind: DepositKind::CardDeposit,
                        symbol: None,
                        qty: None,
                        usd: Some(amount),
                        reference: reference.clone(),
                        ts: now_millis(),
                    },
                );
            })
            .await?;

        // REAL cash tracks the wallet balance absolutely, not additively
        let new_balance = wallet.usd;
        self.mutate_real_portfolio(user_id, move |portfolio| {
            portfolio.cash_usd = new_balance;
        })
        .await?;

        Ok(wallet)
    }

    /// Simulated on-chain deposit crediting a wallet asset
    #[instrument(skip(self))]
    pub async fn deposit_crypto(
        &self,
        user_id: &str,
        symbol: &str,
        qty: Decimal,
        tx_hash: Option<&str>,
    ) -> Result<Wallet> {
        if symbol.trim().is_empty() {
            return Err(ExchangeError::InvalidInput("symbol required".to_string()));
        }
        if qty <= Decimal::ZERO {
            return Err(ExchangeError::InvalidAmount("qty (>0) required".to_string()));
        }

        let entry = self
            .markets
            .find(symbol)
            .await?
            .ok_or_else(|| ExchangeError::UnknownAsset(symbol.trim().to_uppercase()))?;
        let qty = round_qty(qty);
        let reference = clean_reference(tx_hash, "TX");

        let wallet = self
            .mutate_wallet(user_id, |wallet| {
                wallet.upsert_asset(&entry.symbol, qty);
                wallet.transactions.insert(
                    0,
                    WalletTransaction {
                        kind: DepositKind::CryptoDeposit,
                        symbol: Some(entry.symbol.clone()),
                        qty: Some(qty),
                        usd: None,
                        reference: reference.clone(),
                        ts: now_millis(),
                    },
                );
            })
            .await?;

        // mirror into REAL holdings at the current price
        self.mutate_real_portfolio(user_id, |portfolio| {
            portfolio.merge_holding(&entry.symbol, &entry.name, qty, entry.price);
        })
        .await?;

        Ok(wallet)
    }

    async fn mutate_wallet<F>(&self, user_id: &str, mutate: F) -> Result<Wallet>
    where
        F: Fn(&mut Wallet),
    {
        let mut attempts = 0;
        loop {
            let mut wallet = self.wallets.find_or_create(user_id).await?;
            mutate(&mut wallet);
            match self.wallets.update(&wallet).await {
                Ok(saved) => return Ok(saved),
                Err(err) if err.is_conflict() && attempts < self.max_retries => attempts += 1,
                Err(err) => return Err(err),
            }
        }
    }

    async fn mutate_real_portfolio<F>(&self, user_id: &str, mutate: F) -> Result<Portfolio>
    where
        F: Fn(&mut Portfolio),
    {
        let mut attempts = 0;
        loop {
            let mut portfolio = self
                .portfolios
                .find_or_create(user_id, TradeMode::Real, Decimal::ZERO)
                .await?;
            mutate(&mut portfolio);
            match self.portfolios.update(&portfolio).await {
                Ok(saved) => return Ok(saved),
                Err(err) if err.is_conflict() && attempts < self.max_retries => attempts += 1,
                Err(err) => return Err(err),
            }
        }
    }
}

fn clean_reference(input: Option<&str>, fallback: &str) -> String {
    input
        .map(str::trim)
        .filter(|reference| !reference.is_empty())
        .unwrap_or(fallback)
        .chars()
        .take(REFERENCE_MAX_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_reference_falls_back_when_blank() {
        assert_eq!(clean_reference(None, "CARD"), "CARD");
        assert_eq!(clean_reference(Some("   "), "CARD"), "CARD");
        assert_eq!(clean_reference(Some(" VISA-1 "), "CARD"), "VISA-1");
    }

    #[test]
    fn test_clean_reference_truncates() {
        let long = "x".repeat(200);
        let cleaned = clean_reference(Some(&long), "TX");
        assert_eq!(cleaned.len(), REFERENCE_MAX_LEN);
    }
}
