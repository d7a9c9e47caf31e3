//! # tether-auth
//!
//! Admission credentials for the Tether hub:
//!
//! - [`otp::TokenStore`]: time-bounded, single-use admission tokens with a
//!   cancellable background sweep
//! - [`credentials::CredentialVerifier`]: the login seam, with a
//!   config-backed implementation
//! - [`password::hasher::PasswordHasher`]: Argon2id hashing for stored credentials

pub mod credentials;
pub mod otp;
pub mod password;

pub use credentials::{ConfigCredentialVerifier, CredentialVerifier};
pub use otp::{OneTimeToken, TokenStore};
pub use password::hasher::PasswordHasher;
