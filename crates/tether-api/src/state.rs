//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use tether_auth::CredentialVerifier;
use tether_core::config::AppConfig;
use tether_realtime::RealtimeEngine;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Connection engine: registry, token store, metrics
    pub engine: RealtimeEngine,
    /// Login credential check
    pub verifier: Arc<dyn CredentialVerifier>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Bundles the shared dependencies.
    pub fn new(
        config: AppConfig,
        engine: RealtimeEngine,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            engine,
            verifier,
        }
    }
}
