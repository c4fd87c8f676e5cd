//! Map-backed store for tests and single-process deployments

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use super::{PortfolioStore, UserStore, WalletStore};
use crate::common::errors::{ExchangeError, Result};
use crate::common::types::{Portfolio, TradeMode, Wallet};
use crate::users::User;

/// In-memory store backing all three persistence seams
#[derive(Default)]
pub struct MemoryStore {
    portfolios: Mutex<HashMap<(String, TradeMode), Portfolio>>,
    wallets: Mutex<HashMap<String, Wallet>>,
    users: Mutex<HashMap<String, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PortfolioStore for MemoryStore {
    async fn find(&self, user_id: &str, mode: TradeMode) -> Result<Option<Portfolio>> {
        let portfolios = self.portfolios.lock().await;
        Ok(portfolios.get(&(user_id.to_string(), mode)).cloned())
    }

    async fn find_or_create(
        &self,
        user_id: &str,
        mode: TradeMode,
        starting_cash: Decimal,
    ) -> Result<Portfolio> {
        let mut portfolios = self.portfolios.lock().await;
        let portfolio = portfolios
            .entry((user_id.to_string(), mode))
            .or_insert_with(|| Portfolio::new(user_id, mode, starting_cash));
        Ok(portfolio.clone())
    }

    async fn update(&self, portfolio: &Portfolio) -> Result<Portfolio> {
        let mut portfolios = self.portfolios.lock().await;
        let key = (portfolio.user_id.clone(), portfolio.mode);
        match portfolios.get_mut(&key) {
            Some(stored) if stored.version == portfolio.version => {
                let mut next = portfolio.clone();
                next.version += 1;
                *stored = next.clone();
                Ok(next)
            }
            Some(stored) => Err(ExchangeError::Conflict(format!(
                "portfolio {}/{} changed underneath (stored v{}, ours v{})",
                portfolio.user_id, portfolio.mode, stored.version, portfolio.version
            ))),
            None => Err(ExchangeError::Storage(format!(
                "portfolio {}/{} does not exist",
                portfolio.user_id, portfolio.mode
            ))),
        }
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn find_or_create(&self, user_id: &str) -> Result<Wallet> {
        let mut wallets = self.wallets.lock().await;
        let wallet = wallets
            .entry(user_id.to_string())
            .or_insert_with(|| Wallet::new(user_id));
        Ok(wallet.clone())
    }

    async fn update(&self, wallet: &Wallet) -> Result<Wallet> {
        let mut wallets = self.wallets.lock().await;
        match wallets.get_mut(&wallet.user_id) {
            Some(stored) if stored.version == wallet.version => {
                let mut next = wallet.clone();
                next.version += 1;
                *stored = next.clone();
                Ok(next)
            }
            Some(stored) => Err(ExchangeError::Conflict(format!(
                "wallet {} changed underneath (stored v{}, ours v{})",
                wallet.user_id, stored.version, wallet.version
            ))),
            None => Err(ExchangeError::Storage(format!(
                "wallet {} does not exist",
                wallet.user_id
            ))),
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: &User) -> Result<User> {
        let mut users = self.users.lock().await;
        let collision = users
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email));
        if collision {
            return Err(ExchangeError::DuplicateEmail(user.email.clone()));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update(&self, user: &User) -> Result<User> {
        let mut users = self.users.lock().await;
        match users.get_mut(&user.id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(user.clone())
            }
            None => Err(ExchangeError::Storage(format!(
                "user {} does not exist",
                user.id
            ))),
        }
    }
}
