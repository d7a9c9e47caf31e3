//! # tether-core
//!
//! Core crate for the Tether connection hub. Contains the configuration
//! schema, typed identifiers, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Tether crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
