//! Gateway access tokens
//!
//! A token is `payload.signature` where the payload is
//! base64url("user_id.expiry") and the signature is HMAC-SHA256 over the
//! payload bytes, keyed by the shared gateway secret. The expiry is epoch
//! seconds. Whoever holds the secret can mint tokens; the gateway only
//! verifies them.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::common::errors::{ExchangeError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Mint a token for `user_id` expiring at `expires_at` (epoch seconds)
pub fn sign_token(secret: &str, user_id: &str, expires_at: i64) -> Result<String> {
    let payload = URL_SAFE_NO_PAD.encode(format!("{}.{}", user_id, expires_at));
    let signature = URL_SAFE_NO_PAD.encode(hmac_over(secret, &payload)?);
    Ok(format!("{}.{}", payload, signature))
}

/// Verify a token and return the user id it names
pub fn verify_token(secret: &str, token: &str) -> Result<String> {
    let (payload, signature) = token
        .rsplit_once('.')
        .ok_or_else(|| ExchangeError::Authentication("malformed token".to_string()))?;

    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| ExchangeError::Authentication("malformed token signature".to_string()))?;
    let mut mac = new_mac(secret)?;
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| ExchangeError::Authentication("invalid token signature".to_string()))?;

    let decoded = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| ExchangeError::Authentication("malformed token payload".to_string()))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| ExchangeError::Authentication("malformed token payload".to_string()))?;
    let (user_id, expiry) = decoded
        .rsplit_once('.')
        .ok_or_else(|| ExchangeError::Authentication("malformed token payload".to_string()))?;

    let expires_at: i64 = expiry
        .parse()
        .map_err(|_| ExchangeError::Authentication("malformed token expiry".to_string()))?;
    if expires_at < Utc::now().timestamp() {
        return Err(ExchangeError::Authentication("token expired".to_string()));
    }
    if user_id.is_empty() {
        return Err(ExchangeError::Authentication("token missing subject".to_string()));
    }

    Ok(user_id.to_string())
}

fn new_mac(secret: &str) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ExchangeError::Authentication(format!("failed to key HMAC: {}", e)))
}

fn hmac_over(secret: &str, payload: &str) -> Result<Vec<u8>> {
    let mut mac = new_mac(secret)?;
    mac.update(payload.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}
