//! Domain types shared across the exchange core

use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Decimal places kept for stored USD balances
pub const USD_DECIMALS: u32 = 2;
/// Decimal places kept for stored asset quantities and cost bases
pub const QTY_DECIMALS: u32 = 8;

/// Round a USD balance to its stored precision
pub fn round_usd(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(USD_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// Round an asset quantity (or cost basis) to its stored precision
pub fn round_qty(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(QTY_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// Current wall-clock time as epoch milliseconds, the wire timestamp format
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Trading context for a portfolio (virtual or funded)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeMode {
    Demo,
    Real,
}

impl TradeMode {
    /// Normalize free-form input: exactly REAL (any case) maps to Real,
    /// everything else falls back to Demo
    pub fn normalize(input: &str) -> Self {
        if input.trim().eq_ignore_ascii_case("REAL") {
            TradeMode::Real
        } else {
            TradeMode::Demo
        }
    }
}

impl std::fmt::Display for TradeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeMode::Demo => write!(f, "DEMO"),
            TradeMode::Real => write!(f, "REAL"),
        }
    }
}

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "BUY"),
            TradeSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Deposit kinds recorded in a wallet's transaction log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepositKind {
    CardDeposit,
    CryptoDeposit,
}

impl std::fmt::Display for DepositKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DepositKind::CardDeposit => write!(f, "CARD_DEPOSIT"),
            DepositKind::CryptoDeposit => write!(f, "CRYPTO_DEPOSIT"),
        }
    }
}

/// One entry in the cached market snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketEntry {
    /// Provider asset identifier (e.g. "bitcoin")
    pub id: String,
    /// Human-readable asset name
    pub name: String,
    /// Ticker symbol, always uppercased
    pub symbol: String,
    /// Icon URL passed through from the provider
    #[serde(default)]
    pub image: String,
    /// Current price in USD
    pub price: Decimal,
    /// 24h price change percentage
    pub change_24h: Decimal,
    /// Market capitalization in USD
    pub market_cap: Decimal,
}

/// A position in one asset within a portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    /// Ticker symbol, unique within the portfolio
    pub symbol: String,
    /// Asset name as listed in the market snapshot
    pub name: String,
    /// Quantity owned, 8 dp
    pub qty: Decimal,
    /// Weighted-average purchase price
    pub avg_buy: Decimal,
}

/// One executed order in a portfolio's append-only trade log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// BUY or SELL
    #[serde(rename = "type")]
    pub side: TradeSide,
    /// Ticker symbol traded
    pub symbol: String,
    /// Quantity traded
    pub qty: Decimal,
    /// Execution price per unit
    pub price: Decimal,
    /// Total order value in USD
    pub total: Decimal,
    /// Execution time, epoch milliseconds
    pub ts: i64,
}

/// Persisted per-(user, mode) trading record
///
/// `version` is a revision counter: every committed write bumps it by one
/// and a write only commits when the stored version still matches the one
/// this copy was read at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    /// Owning user
    pub user_id: String,
    /// Trading context this record belongs to
    pub mode: TradeMode,
    /// Cash balance in USD, 2 dp, never negative
    #[serde(rename = "cashUSD")]
    pub cash_usd: Decimal,
    /// Open positions, at most one per symbol
    #[serde(default)]
    pub holdings: Vec<Holding>,
    /// Executed orders, newest first
    #[serde(default)]
    pub trades: Vec<TradeRecord>,
    /// Revision counter for compare-and-swap writes
    #[serde(default)]
    pub version: u64,
}

impl Portfolio {
    /// Create a fresh portfolio with the given starting cash
    pub fn new(user_id: impl Into<String>, mode: TradeMode, starting_cash: Decimal) -> Self {
        Self {
            user_id: user_id.into(),
            mode,
            cash_usd: starting_cash,
            holdings: Vec::new(),
            trades: Vec::new(),
            version: 0,
        }
    }

    /// Look up the holding for a symbol, if any
    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.iter().find(|h| h.symbol == symbol)
    }

    /// Merge a quantity bought at `price` into the holding for `symbol`,
    /// creating the holding when absent. Existing positions take the
    /// quantity-weighted average cost basis.
    pub fn merge_holding(&mut self, symbol: &str, name: &str, qty: Decimal, price: Decimal) {
        match self.holdings.iter_mut().find(|h| h.symbol == symbol) {
            Some(holding) => {
                let new_avg =
                    (holding.qty * holding.avg_buy + qty * price) / (holding.qty + qty);
                holding.qty = round_qty(holding.qty + qty);
                // cost basis keeps 8 dp so sub-cent assets stay representable
                holding.avg_buy = round_qty(new_avg);
            }
            None => self.holdings.push(Holding {
                symbol: symbol.to_string(),
                name: name.to_string(),
                qty: round_qty(qty),
                avg_buy: price,
            }),
        }
    }

    /// Reduce the holding for `symbol` by `qty`, removing it entirely once
    /// nothing (after 8 dp rounding) remains. Callers validate the quantity
    /// beforehand; an unknown symbol is a no-op.
    pub fn reduce_holding(&mut self, symbol: &str, qty: Decimal) {
        if let Some(pos) = self.holdings.iter().position(|h| h.symbol == symbol) {
            let remaining = round_qty(self.holdings[pos].qty - qty);
            if remaining <= Decimal::ZERO {
                self.holdings.remove(pos);
            } else {
                self.holdings[pos].qty = remaining;
            }
        }
    }
}

/// One asset balance held in a wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAsset {
    /// Ticker symbol, uppercased, unique within the wallet
    pub symbol: String,
    /// Quantity on deposit, 8 dp
    pub qty: Decimal,
}

/// One deposit in a wallet's append-only transaction log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletTransaction {
    /// CARD_DEPOSIT or CRYPTO_DEPOSIT
    #[serde(rename = "type")]
    pub kind: DepositKind,
    /// Deposited symbol (crypto deposits only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Deposited quantity (crypto deposits only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qty: Option<Decimal>,
    /// Deposited USD amount (card deposits only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usd: Option<Decimal>,
    /// Caller-supplied reference, truncated to 64 chars
    pub reference: String,
    /// Deposit time, epoch milliseconds
    pub ts: i64,
}

/// Persisted per-user wallet holding simulated deposits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    /// Owning user
    pub user_id: String,
    /// USD balance, 2 dp
    pub usd: Decimal,
    /// Asset balances, at most one per symbol
    #[serde(default)]
    pub assets: Vec<WalletAsset>,
    /// Deposits, newest first
    #[serde(default)]
    pub transactions: Vec<WalletTransaction>,
    /// Revision counter for compare-and-swap writes
    #[serde(default)]
    pub version: u64,
}

impl Wallet {
    /// Create an empty wallet for a user
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            usd: Decimal::ZERO,
            assets: Vec::new(),
            transactions: Vec::new(),
            version: 0,
        }
    }

    /// Add `qty` to the asset balance for `symbol`, creating it when absent
    pub fn upsert_asset(&mut self, symbol: &str, qty: Decimal) {
        match self.assets.iter_mut().find(|a| a.symbol == symbol) {
            Some(asset) => asset.qty = round_qty(asset.qty + qty),
            None => self.assets.push(WalletAsset {
                symbol: symbol.to_string(),
                qty: round_qty(qty),
            }),
        }
    }
}
