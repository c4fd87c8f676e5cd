//! Trading module for order execution and portfolio accounting
//!
//! This module owns every mutation of portfolio and wallet state.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    READ (derived)                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PortfolioView / WalletSummary                              │
//! │    - Projected from stored records + market snapshot        │
//! │    - value, pnl and totals computed on every read           │
//! │    - Never persisted                                        │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    WRITE (optimistic)                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Request arrives                                            │
//! │       │                                                     │
//! │       ▼                                                     │
//! │  Validate qty, resolve snapshot price                       │
//! │       │                                                     │
//! │       ▼                                                     │
//! │  Read portfolio → check funds → apply → CAS write           │
//! │       │ (version mismatch re-runs from the read,            │
//! │       ▼  bounded by max_conflict_retries)                   │
//! │  Commit, then notify subscribers                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TradeEngine`]: Buy/sell execution against DEMO and REAL portfolios
//! - [`WalletService`]: Simulated card and crypto deposits, wallet summary
//! - [`PortfolioView`] / [`WalletSummary`]: Priced read-model projections
//! - [`TradeOutcome`] / [`DepositOutcome`]: Response envelopes
//!
//! # Example
//!
//! ```ignore
//! use cryptotrade_core::trading::TradeEngine;
//! use cryptotrade_core::common::types::TradeMode;
//! use rust_decimal_macros::dec;
//!
//! let portfolio = engine.buy("user-1", TradeMode::Demo, "BTC", dec!(0.5)).await?;
//! assert_eq!(portfolio.holdings[0].symbol, "BTC");
//! ```

mod engine;
mod types;
mod wallet;

pub use engine::TradeEngine;

pub use types::{
    DepositOutcome,
    HoldingView,
    PortfolioView,
    TradeOutcome,
    WalletAssetView,
    WalletSummary,
};

pub use wallet::{WalletService, REFERENCE_MAX_LEN};
