//! One-time admission tokens.

pub mod store;
pub mod sweeper;

pub use store::{OneTimeToken, TokenStore};
