//! Projections derived from stored records and current prices

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::types::{
    round_usd, MarketEntry, Portfolio, TradeMode, TradeRecord, Wallet, WalletTransaction,
};
use crate::market::find_symbol;

/// A holding enriched with its current market price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingView {
    pub symbol: String,
    pub name: String,
    pub qty: Decimal,
    pub avg_buy: Decimal,
    /// Current price, zero once the asset has dropped out of the snapshot
    pub price: Decimal,
    /// qty * price
    pub value: Decimal,
    /// value - qty * avgBuy
    pub pnl: Decimal,
}

/// Point-in-time portfolio projection; derived on read, never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioView {
    pub mode: TradeMode,
    #[serde(rename = "cashUSD")]
    pub cash_usd: Decimal,
    pub holdings_value: Decimal,
    #[serde(rename = "totalUSD")]
    pub total_usd: Decimal,
    pub holdings: Vec<HoldingView>,
    pub trades: Vec<TradeRecord>,
}

impl PortfolioView {
    /// Project stored state against a market snapshot
    pub fn project(portfolio: &Portfolio, markets: &[MarketEntry]) -> Self {
        let holdings: Vec<HoldingView> = portfolio
            .holdings
            .iter()
            .map(|holding| {
                let price = find_symbol(markets, &holding.symbol)
                    .map(|entry| entry.price)
                    .unwrap_or(Decimal::ZERO);
                let value = holding.qty * price;
                HoldingView {
                    symbol: holding.symbol.clone(),
                    name: holding.name.clone(),
                    qty: holding.qty,
                    avg_buy: holding.avg_buy,
                    price,
                    value,
                    pnl: value - holding.qty * holding.avg_buy,
                }
            })
            .collect();

        let holdings_value: Decimal = holdings.iter().map(|h| h.value).sum();

        Self {
            mode: portfolio.mode,
            cash_usd: portfolio.cash_usd,
            holdings_value,
            total_usd: portfolio.cash_usd + holdings_value,
            holdings,
            trades: portfolio.trades.clone(),
        }
    }
}

/// One asset row in the wallet summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAssetView {
    pub symbol: String,
    pub qty: Decimal,
    pub price: Decimal,
    #[serde(rename = "valueUSD")]
    pub value_usd: Decimal,
}

/// Wallet balances priced against a market snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSummary {
    pub usd: Decimal,
    #[serde(rename = "assetsValueUSD")]
    pub assets_value_usd: Decimal,
    #[serde(rename = "totalUSD")]
    pub total_usd: Decimal,
    pub assets: Vec<WalletAssetView>,
    pub transactions: Vec<WalletTransaction>,
}

impl WalletSummary {
    /// Project a wallet against a market snapshot
    pub fn project(wallet: &Wallet, markets: &[MarketEntry]) -> Self {
        let assets: Vec<WalletAssetView> = wallet
            .assets
            .iter()
            .map(|asset| {
                let price = find_symbol(markets, &asset.symbol)
                    .map(|entry| entry.price)
                    .unwrap_or(Decimal::ZERO);
                WalletAssetView {
                    symbol: asset.symbol.clone(),
                    qty: asset.qty,
                    price,
                    value_usd: round_usd(asset.qty * price),
                }
            })
            .collect();

        let assets_value_usd: Decimal = assets.iter().map(|a| a.value_usd).sum();

        Self {
            usd: wallet.usd,
            assets_value_usd,
            total_usd: round_usd(wallet.usd + assets_value_usd),
            assets,
            transactions: wallet.transactions.clone(),
        }
    }
}

/// Response envelope for an executed trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub message: String,
    pub portfolio: PortfolioView,
}

/// Response envelope for a deposit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositOutcome {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usd: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Holding;
    use rust_decimal_macros::dec;

    fn entry(symbol: &str, price: Decimal) -> MarketEntry {
        MarketEntry {
            id: symbol.to_lowercase(),
            name: symbol.to_string(),
            symbol: symbol.to_string(),
            image: String::new(),
            price,
            change_24h: dec!(0),
            market_cap: dec!(0),
        }
    }

    #[test]
    fn test_portfolio_projection_math() {
        let mut portfolio = Portfolio::new("user-1", TradeMode::Demo, dec!(50000));
        portfolio.holdings.push(Holding {
            symbol: "BTC".to_string(),
            name: "Bitcoin".to_string(),
            qty: dec!(0.5),
            avg_buy: dec!(40000),
        });

        let view = PortfolioView::project(&portfolio, &[entry("BTC", dec!(50000))]);

        assert_eq!(view.holdings[0].value, dec!(25000));
        assert_eq!(view.holdings[0].pnl, dec!(5000));
        assert_eq!(view.holdings_value, dec!(25000));
        assert_eq!(view.total_usd, dec!(75000));
    }

    #[test]
    fn test_vanished_asset_prices_at_zero() {
        let mut portfolio = Portfolio::new("user-1", TradeMode::Demo, dec!(1000));
        portfolio.holdings.push(Holding {
            symbol: "OLD".to_string(),
            name: "Delisted".to_string(),
            qty: dec!(10),
            avg_buy: dec!(3),
        });

        let view = PortfolioView::project(&portfolio, &[entry("BTC", dec!(50000))]);

        assert_eq!(view.holdings[0].price, dec!(0));
        assert_eq!(view.holdings[0].value, dec!(0));
        assert_eq!(view.holdings[0].pnl, dec!(-30));
        assert_eq!(view.total_usd, dec!(1000));
    }

    #[test]
    fn test_wallet_summary_rounds_asset_values() {
        let mut wallet = Wallet::new("user-1");
        wallet.usd = dec!(100.50);
        wallet.upsert_asset("DOGE", dec!(3));

        let summary = WalletSummary::project(&wallet, &[entry("DOGE", dec!(0.333333))]);

        assert_eq!(summary.assets[0].value_usd, dec!(1.00));
        assert_eq!(summary.assets_value_usd, dec!(1.00));
        assert_eq!(summary.total_usd, dec!(101.50));
    }

    #[test]
    fn test_wire_field_names() {
        let portfolio = Portfolio::new("user-1", TradeMode::Demo, dec!(100000));
        let view = PortfolioView::project(&portfolio, &[]);
        let json = serde_json::to_value(&view).unwrap();

        assert!(json.get("cashUSD").is_some());
        assert!(json.get("totalUSD").is_some());
        assert!(json.get("holdingsValue").is_some());

        let summary = WalletSummary::project(&Wallet::new("user-1"), &[]);
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("assetsValueUSD").is_some());
        assert!(json.get("totalUSD").is_some());
    }
}
