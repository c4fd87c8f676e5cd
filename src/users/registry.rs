//! User records and the registration registry
//!
//! The registry owns the identity data model: unique lowercased emails,
//! opaque credential hashes and the transient challenge state an external
//! auth layer mutates during login and password-reset exchanges. Codes and
//! reset tokens are never stored in the clear, only their digests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::instrument;

use crate::common::errors::{ExchangeError, Result};
use crate::store::BoxedUserStore;

/// Identity record for one registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    /// Lowercased, unique case-insensitively
    pub email: String,
    /// Opaque credential hash issued by the auth layer
    pub password_hash: String,
    /// One-time-code challenge state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp_expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp_last_sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub otp_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp_locked_until: Option<DateTime<Utc>>,
    /// Password-reset challenge state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_token_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_last_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a new record with a stable id derived from the email
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        let email = email.into();
        let now = Utc::now();
        Self {
            id: derive_user_id(&email),
            name: name.into(),
            email,
            password_hash: password_hash.into(),
            otp_hash: None,
            otp_expires_at: None,
            otp_last_sent_at: None,
            otp_attempts: 0,
            otp_locked_until: None,
            reset_token_hash: None,
            reset_token_expires_at: None,
            reset_last_sent_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a freshly issued one-time code, keeping only its digest
    pub fn set_one_time_code(&mut self, code: &str, expires_at: DateTime<Utc>) {
        self.otp_hash = Some(challenge_digest(code));
        self.otp_expires_at = Some(expires_at);
        self.otp_last_sent_at = Some(Utc::now());
        self.otp_attempts = 0;
        self.otp_locked_until = None;
        self.updated_at = Utc::now();
    }

    /// Drop any outstanding one-time code
    pub fn clear_one_time_code(&mut self) {
        self.otp_hash = None;
        self.otp_expires_at = None;
        self.otp_attempts = 0;
        self.otp_locked_until = None;
        self.updated_at = Utc::now();
    }

    /// Record a password-reset token, keeping only its digest
    pub fn set_reset_token(&mut self, token: &str, expires_at: DateTime<Utc>) {
        self.reset_token_hash = Some(challenge_digest(token));
        self.reset_token_expires_at = Some(expires_at);
        self.reset_last_sent_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    /// Drop any outstanding reset token
    pub fn clear_reset_token(&mut self) {
        self.reset_token_hash = None;
        self.reset_token_expires_at = None;
        self.updated_at = Utc::now();
    }
}

/// Hex SHA-256 digest used for one-time codes and reset tokens
pub fn challenge_digest(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Stable 24-hex-char identifier derived from the lowercased email
fn derive_user_id(email: &str) -> String {
    let digest = Sha256::digest(email.as_bytes());
    hex::encode(&digest[..12])
}

/// Store-backed registry for user records
pub struct UserRegistry {
    store: BoxedUserStore,
}

impl UserRegistry {
    pub fn new(store: BoxedUserStore) -> Self {
        Self { store }
    }

    /// Register a new user; the email is unique case-insensitively
    #[instrument(skip(self, password_hash))]
    pub async fn register(&self, name: &str, email: &str, password_hash: &str) -> Result<User> {
        let name = name.trim();
        let email = email.trim().to_lowercase();
        if name.is_empty() || email.is_empty() || password_hash.is_empty() {
            return Err(ExchangeError::InvalidInput(
                "name, email and password required".to_string(),
            ));
        }

        let user = User::new(name, email, password_hash);
        self.store.create(&user).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        self.store.find_by_id(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.store.find_by_email(&email.trim().to_lowercase()).await
    }

    /// Persist challenge-state changes made on a record
    pub async fn save(&self, user: &User) -> Result<User> {
        self.store.update(user).await
    }
}
