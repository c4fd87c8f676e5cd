//! Common module - shared domain types and errors

pub mod errors;
pub mod types;

pub use errors::{ExchangeError, Result};
