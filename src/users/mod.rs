//! User identity records and registration

pub mod registry;

pub use registry::{challenge_digest, User, UserRegistry};
