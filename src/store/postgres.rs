//! Postgres store backend
//!
//! Uses the runtime query API throughout: statements bind parameters and
//! map rows by hand, so no live database is needed at compile time.
//! Holdings, trades, assets and transaction logs ride in JSONB document
//! columns; the version column backs the compare-and-swap writes.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;

use super::{PortfolioStore, UserStore, WalletStore};
use crate::common::errors::{ExchangeError, Result};
use crate::common::types::{Portfolio, TradeMode, Wallet};
use crate::config::types::DatabaseConfig;
use crate::users::User;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS portfolios (
        user_id   TEXT    NOT NULL,
        mode      TEXT    NOT NULL,
        cash_usd  NUMERIC NOT NULL,
        holdings  JSONB   NOT NULL DEFAULT '[]',
        trades    JSONB   NOT NULL DEFAULT '[]',
        version   BIGINT  NOT NULL DEFAULT 0,
        PRIMARY KEY (user_id, mode)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS wallets (
        user_id      TEXT    PRIMARY KEY,
        usd          NUMERIC NOT NULL DEFAULT 0,
        assets       JSONB   NOT NULL DEFAULT '[]',
        transactions JSONB   NOT NULL DEFAULT '[]',
        version      BIGINT  NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id                     TEXT        PRIMARY KEY,
        name                   TEXT        NOT NULL,
        email                  TEXT        NOT NULL,
        password_hash          TEXT        NOT NULL,
        otp_hash               TEXT,
        otp_expires_at         TIMESTAMPTZ,
        otp_last_sent_at       TIMESTAMPTZ,
        otp_attempts           INTEGER     NOT NULL DEFAULT 0,
        otp_locked_until       TIMESTAMPTZ,
        reset_token_hash       TEXT,
        reset_token_expires_at TIMESTAMPTZ,
        reset_last_sent_at     TIMESTAMPTZ,
        created_at             TIMESTAMPTZ NOT NULL,
        updated_at             TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS users_email_lower_idx ON users ((lower(email)))
    "#,
];

/// Postgres-backed store for portfolios, wallets and users
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect a pool and make sure the schema exists
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .connect(&config.url)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        info!("Database schema ready");
        Ok(store)
    }

    /// Wrap an existing pool, assuming the schema is in place
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    fn portfolio_from_row(row: &PgRow) -> Result<Portfolio> {
        let mode: String = row.try_get("mode")?;
        let holdings: serde_json::Value = row.try_get("holdings")?;
        let trades: serde_json::Value = row.try_get("trades")?;
        let version: i64 = row.try_get("version")?;
        Ok(Portfolio {
            user_id: row.try_get("user_id")?,
            mode: TradeMode::normalize(&mode),
            cash_usd: row.try_get("cash_usd")?,
            holdings: serde_json::from_value(holdings)?,
            trades: serde_json::from_value(trades)?,
            version: version as u64,
        })
    }

    fn wallet_from_row(row: &PgRow) -> Result<Wallet> {
        let assets: serde_json::Value = row.try_get("assets")?;
        let transactions: serde_json::Value = row.try_get("transactions")?;
        let version: i64 = row.try_get("version")?;
        Ok(Wallet {
            user_id: row.try_get("user_id")?,
            usd: row.try_get("usd")?,
            assets: serde_json::from_value(assets)?,
            transactions: serde_json::from_value(transactions)?,
            version: version as u64,
        })
    }

    fn user_from_row(row: &PgRow) -> Result<User> {
        let attempts: i32 = row.try_get("otp_attempts")?;
        Ok(User {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            otp_hash: row.try_get("otp_hash")?,
            otp_expires_at: row.try_get("otp_expires_at")?,
            otp_last_sent_at: row.try_get("otp_last_sent_at")?,
            otp_attempts: attempts.max(0) as u32,
            otp_locked_until: row.try_get("otp_locked_until")?,
            reset_token_hash: row.try_get("reset_token_hash")?,
            reset_token_expires_at: row.try_get("reset_token_expires_at")?,
            reset_last_sent_at: row.try_get("reset_last_sent_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl PortfolioStore for PgStore {
    async fn find(&self, user_id: &str, mode: TradeMode) -> Result<Option<Portfolio>> {
        let row = sqlx::query(
            "SELECT user_id, mode, cash_usd, holdings, trades, version \
             FROM portfolios WHERE user_id = $1 AND mode = $2",
        )
        .bind(user_id)
        .bind(mode.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::portfolio_from_row).transpose()
    }

    async fn find_or_create(
        &self,
        user_id: &str,
        mode: TradeMode,
        starting_cash: Decimal,
    ) -> Result<Portfolio> {
        sqlx::query(
            "INSERT INTO portfolios (user_id, mode, cash_usd) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, mode) DO NOTHING",
        )
        .bind(user_id)
        .bind(mode.to_string())
        .bind(starting_cash)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            "SELECT user_id, mode, cash_usd, holdings, trades, version \
             FROM portfolios WHERE user_id = $1 AND mode = $2",
        )
        .bind(user_id)
        .bind(mode.to_string())
        .fetch_one(&self.pool)
        .await?;

        Self::portfolio_from_row(&row)
    }

    async fn update(&self, portfolio: &Portfolio) -> Result<Portfolio> {
        let holdings = serde_json::to_value(&portfolio.holdings)?;
        let trades = serde_json::to_value(&portfolio.trades)?;

        let row = sqlx::query(
            "UPDATE portfolios \
             SET cash_usd = $3, holdings = $4, trades = $5, version = version + 1 \
             WHERE user_id = $1 AND mode = $2 AND version = $6 \
             RETURNING user_id, mode, cash_usd, holdings, trades, version",
        )
        .bind(&portfolio.user_id)
        .bind(portfolio.mode.to_string())
        .bind(portfolio.cash_usd)
        .bind(holdings)
        .bind(trades)
        .bind(portfolio.version as i64)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::portfolio_from_row(&row),
            None => Err(ExchangeError::Conflict(format!(
                "portfolio {}/{} changed underneath (ours v{})",
                portfolio.user_id, portfolio.mode, portfolio.version
            ))),
        }
    }
}

#[async_trait]
impl WalletStore for PgStore {
    async fn find_or_create(&self, user_id: &str) -> Result<Wallet> {
        sqlx::query("INSERT INTO wallets (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        let row = sqlx::query(
            "SELECT user_id, usd, assets, transactions, version FROM wallets WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Self::wallet_from_row(&row)
    }

    async fn update(&self, wallet: &Wallet) -> Result<Wallet> {
        let assets = serde_json::to_value(&wallet.assets)?;
        let transactions = serde_json::to_value(&wallet.transactions)?;

        let row = sqlx::query(
            "UPDATE wallets \
             SET usd = $2, assets = $3, transactions = $4, version = version + 1 \
             WHERE user_id = $1 AND version = $5 \
             RETURNING user_id, usd, assets, transactions, version",
        )
        .bind(&wallet.user_id)
        .bind(wallet.usd)
        .bind(assets)
        .bind(transactions)
        .bind(wallet.version as i64)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::wallet_from_row(&row),
            None => Err(ExchangeError::Conflict(format!(
                "wallet {} changed underneath (ours v{})",
                wallet.user_id, wallet.version
            ))),
        }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create(&self, user: &User) -> Result<User> {
        let result = sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, otp_hash, otp_expires_at, \
             otp_last_sent_at, otp_attempts, otp_locked_until, reset_token_hash, \
             reset_token_expires_at, reset_last_sent_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.otp_hash.as_deref())
        .bind(user.otp_expires_at)
        .bind(user.otp_last_sent_at)
        .bind(user.otp_attempts as i32)
        .bind(user.otp_locked_until)
        .bind(user.reset_token_hash.as_deref())
        .bind(user.reset_token_expires_at)
        .bind(user.reset_last_sent_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(user.clone()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(ExchangeError::DuplicateEmail(user.email.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::user_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::user_from_row).transpose()
    }

    async fn update(&self, user: &User) -> Result<User> {
        let result = sqlx::query(
            "UPDATE users SET name = $2, email = $3, password_hash = $4, otp_hash = $5, \
             otp_expires_at = $6, otp_last_sent_at = $7, otp_attempts = $8, \
             otp_locked_until = $9, reset_token_hash = $10, reset_token_expires_at = $11, \
             reset_last_sent_at = $12, updated_at = $13 \
             WHERE id = $1",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.otp_hash.as_deref())
        .bind(user.otp_expires_at)
        .bind(user.otp_last_sent_at)
        .bind(user.otp_attempts as i32)
        .bind(user.otp_locked_until)
        .bind(user.reset_token_hash.as_deref())
        .bind(user.reset_token_expires_at)
        .bind(user.reset_last_sent_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Err(ExchangeError::Storage(format!(
                "user {} does not exist",
                user.id
            ))),
            Ok(_) => Ok(user.clone()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(ExchangeError::DuplicateEmail(user.email.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }
}
