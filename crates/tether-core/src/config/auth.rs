//! One-time token and credential configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// How long an issued one-time token stays valid, in milliseconds.
    #[serde(default = "default_otp_retention")]
    pub otp_retention_ms: u64,
    /// Interval between background sweeps of expired tokens, in milliseconds.
    #[serde(default = "default_otp_sweep_interval")]
    pub otp_sweep_interval_ms: u64,
    /// Accounts accepted by the built-in credential verifier.
    #[serde(default)]
    pub users: Vec<UserCredential>,
}

/// A username and its Argon2 PHC-format password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCredential {
    /// Login name.
    pub username: String,
    /// Argon2id hash in PHC string format.
    pub password_hash: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            otp_retention_ms: default_otp_retention(),
            otp_sweep_interval_ms: default_otp_sweep_interval(),
            users: Vec::new(),
        }
    }
}

impl AuthConfig {
    /// Token retention window.
    pub fn otp_retention(&self) -> Duration {
        Duration::from_millis(self.otp_retention_ms)
    }

    /// Sweep cadence for the token store.
    pub fn otp_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.otp_sweep_interval_ms)
    }

    /// Rejects zero windows, which would panic the sweeper's interval.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.otp_retention_ms == 0 || self.otp_sweep_interval_ms == 0 {
            return Err(AppError::configuration(
                "auth.otp_retention_ms and auth.otp_sweep_interval_ms must be positive",
            ));
        }
        Ok(())
    }
}

fn default_otp_retention() -> u64 {
    5_000
}

fn default_otp_sweep_interval() -> u64 {
    500
}
