//! WebSocket gateway and access token verification

pub mod auth;
pub mod server;

pub use auth::{sign_token, verify_token};
pub use server::Gateway;
