//! Credential verification seam used by the login endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use tether_core::config::UserCredential;
use tether_core::error::AppError;
use tether_core::result::AppResult;

use crate::password::hasher::PasswordHasher;

/// Decides whether a username/password pair may receive an admission token.
#[async_trait]
pub trait CredentialVerifier: Send + Sync + 'static {
    /// Returns `Ok(true)` when the credentials are accepted.
    async fn verify(&self, username: &str, password: &str) -> AppResult<bool>;
}

/// Verifier backed by the `auth.users` list from configuration.
#[derive(Debug, Clone)]
pub struct ConfigCredentialVerifier {
    /// Username → Argon2 PHC hash.
    users: Arc<HashMap<String, String>>,
    hasher: PasswordHasher,
}

impl ConfigCredentialVerifier {
    /// Creates a verifier from configured accounts.
    pub fn new(users: &[UserCredential]) -> Self {
        let users = users
            .iter()
            .map(|u| (u.username.clone(), u.password_hash.clone()))
            .collect();
        Self {
            users: Arc::new(users),
            hasher: PasswordHasher::new(),
        }
    }

    /// Number of configured accounts.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

#[async_trait]
impl CredentialVerifier for ConfigCredentialVerifier {
    async fn verify(&self, username: &str, password: &str) -> AppResult<bool> {
        let Some(hash) = self.users.get(username).cloned() else {
            debug!(username, "Login attempt for unknown user");
            return Ok(false);
        };

        // Argon2 is deliberately slow; keep it off the async workers.
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::internal(format!("Credential check aborted: {e}")))?
    }
}
