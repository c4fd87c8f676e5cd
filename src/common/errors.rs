//! Error types for the exchange core

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type alias using our ExchangeError
pub type Result<T> = std::result::Result<T, ExchangeError>;

/// Main error type for exchange operations
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Symbol does not resolve against the current market snapshot
    #[error("Unknown asset symbol: {0}")]
    UnknownAsset(String),

    /// Cash balance does not cover the order cost
    #[error("Insufficient cash balance: need {required}, have {available}")]
    InsufficientCash {
        required: Decimal,
        available: Decimal,
    },

    /// No holding for the symbol, or the position is smaller than the order
    #[error("Insufficient holdings to sell {symbol}: need {required}, have {available}")]
    InsufficientHoldings {
        symbol: String,
        required: Decimal,
        available: Decimal,
    },

    /// Quantity or amount is non-positive or non-finite
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Malformed request input outside the amount checks
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Concurrent mutation lost the version race after all retries
    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    /// Market provider unreachable and no cached snapshot exists yet
    #[error("Market data unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Registration with an email that is already taken
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    /// Gateway token verification failures
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// WebSocket communication errors
    #[error("WebSocket communication error: {0}")]
    WebSocketCommunication(String),

    /// Persistence faults outside the business taxonomy
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Channel send errors
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExchangeError {
    /// Whether the error is a transient conflict worth retrying
    pub fn is_conflict(&self) -> bool {
        matches!(self, ExchangeError::Conflict(_))
    }
}

impl From<sqlx::Error> for ExchangeError {
    fn from(err: sqlx::Error) -> Self {
        ExchangeError::Storage(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ExchangeError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ExchangeError::WebSocketCommunication(err.to_string())
    }
}
