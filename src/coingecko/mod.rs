//! CoinGecko module - market data provider client

pub mod messages;
pub mod rest;

pub use rest::CoinGeckoRestClient;
