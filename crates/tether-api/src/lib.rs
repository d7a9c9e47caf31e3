//! # tether-api
//!
//! HTTP layer for Tether built on Axum.
//!
//! Exposes the login endpoint that mints one-time tokens, the `/ws`
//! admission endpoint that upgrades and hands the socket to the realtime
//! engine, a health probe, and the CORS/logging middleware around them.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
