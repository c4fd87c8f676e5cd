//! Persistence seams for portfolios, wallets and users
//!
//! Writes are optimistic: `update` commits only when the stored version
//! still matches the caller's copy and bumps it by one. A mismatch
//! surfaces as a `Conflict` so callers can re-read and retry.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::common::errors::Result;
use crate::common::types::{Portfolio, TradeMode, Wallet};
use crate::users::User;

/// Persistence seam for per-(user, mode) portfolios
#[async_trait]
pub trait PortfolioStore: Send + Sync {
    /// Fetch the portfolio for (user, mode) if one exists
    async fn find(&self, user_id: &str, mode: TradeMode) -> Result<Option<Portfolio>>;

    /// Atomic find-or-insert seeded with the given starting cash
    async fn find_or_create(
        &self,
        user_id: &str,
        mode: TradeMode,
        starting_cash: Decimal,
    ) -> Result<Portfolio>;

    /// Compare-and-swap write; a version mismatch is a `Conflict`
    async fn update(&self, portfolio: &Portfolio) -> Result<Portfolio>;
}

/// Type alias for a shared portfolio store
pub type BoxedPortfolioStore = Arc<dyn PortfolioStore>;

/// Persistence seam for per-user wallets
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Fetch the wallet for a user, creating an empty one on first access
    async fn find_or_create(&self, user_id: &str) -> Result<Wallet>;

    /// Compare-and-swap write; a version mismatch is a `Conflict`
    async fn update(&self, wallet: &Wallet) -> Result<Wallet>;
}

/// Type alias for a shared wallet store
pub type BoxedWalletStore = Arc<dyn WalletStore>;

/// Persistence seam for user records
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user; a case-insensitive email collision is a `DuplicateEmail`
    async fn create(&self, user: &User) -> Result<User>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Overwrite the stored record with updated challenge state
    async fn update(&self, user: &User) -> Result<User>;
}

/// Type alias for a shared user store
pub type BoxedUserStore = Arc<dyn UserStore>;

pub use memory::MemoryStore;
pub use postgres::PgStore;
