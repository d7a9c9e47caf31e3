//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tether_auth::TokenStore;
use tether_auth::otp::sweeper::spawn_sweeper;
use tether_core::config::{AuthConfig, RealtimeConfig};
use tether_core::error::AppError;
use tether_core::result::AppResult;

use crate::connection::registry::ConnectionRegistry;
use crate::metrics::RealtimeMetrics;
use crate::router::EventRouter;

/// Central real-time engine: token store, its sweeper, and the registry.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection registry.
    pub registry: Arc<ConnectionRegistry>,
    /// One-time admission tokens.
    pub tokens: Arc<TokenStore>,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
    /// Stops background tasks.
    shutdown: CancellationToken,
    /// Token sweeper task, taken on shutdown.
    sweeper: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("connections", &self.registry.len())
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

impl RealtimeEngine {
    /// Creates the engine and starts the token sweeper.
    ///
    /// Fails with `Configuration` before spawning anything if either config
    /// is invalid. Must be called inside a Tokio runtime.
    pub fn new(
        realtime: RealtimeConfig,
        auth: &AuthConfig,
        router: EventRouter,
    ) -> AppResult<Self> {
        auth.validate()?;
        let shutdown = CancellationToken::new();
        let metrics = Arc::new(RealtimeMetrics::new());
        let tokens = Arc::new(TokenStore::new(auth.otp_retention()));
        let registry = ConnectionRegistry::new(tokens.clone(), router, realtime, metrics.clone())?;

        let sweeper = spawn_sweeper(
            tokens.clone(),
            auth.otp_sweep_interval(),
            shutdown.child_token(),
        );

        info!(
            event_types = ?registry.router().event_types(),
            "Real-time engine initialized"
        );

        Ok(Self {
            registry,
            tokens,
            metrics,
            shutdown,
            sweeper: Arc::new(Mutex::new(Some(sweeper))),
        })
    }

    /// Token that fires when the engine shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stops the sweeper and closes every connection, waiting up to `grace`
    /// for their write pumps to finish.
    pub async fn shutdown(&self, grace: Duration) -> Result<(), AppError> {
        info!("Shutting down real-time engine");

        self.shutdown.cancel();

        let closing = self.registry.close_all();
        let drained = tokio::time::timeout(grace, async {
            for conn in &closing {
                conn.wait_closed().await;
            }
        })
        .await;
        if drained.is_err() {
            warn!(
                grace_ms = grace.as_millis() as u64,
                "Connections still open after shutdown grace period"
            );
        }

        let sweeper = self.sweeper.lock().take();
        if let Some(handle) = sweeper {
            handle
                .await
                .map_err(|e| AppError::internal(format!("Token sweeper failed: {e}")))?;
        }

        info!("Real-time engine shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::connection::transport::Frame;
    use crate::connection::transport::testing::pair;
    use crate::handlers::default_router;

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_connections_and_stops_sweeper() {
        let engine = RealtimeEngine::new(
            RealtimeConfig::default(),
            &AuthConfig::default(),
            default_router().expect("router"),
        )
        .expect("engine");

        let token = engine.tokens.issue();
        let (transport, mut peer) = pair();
        let conn = engine
            .registry
            .admit(transport, Some(&token.key))
            .await
            .expect("admit");

        engine.shutdown(Duration::from_secs(1)).await.expect("shutdown");

        assert!(engine.registry.is_empty());
        assert!(engine.shutdown_token().is_cancelled());
        assert!(!conn.is_active());
        assert_eq!(peer.rx.next().await, Some(Frame::Close(None)));

        // Sweeper is gone: stale tokens are no longer evicted
        engine.tokens.issue();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(engine.tokens.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_spawning() {
        let auth = AuthConfig {
            otp_sweep_interval_ms: 0,
            ..Default::default()
        };
        let router = default_router().expect("router");
        let err = RealtimeEngine::new(RealtimeConfig::default(), &auth, router)
            .expect_err("zero sweep interval accepted");
        assert_eq!(err.kind, tether_core::error::ErrorKind::Configuration);

        let realtime = RealtimeConfig {
            pong_wait_ms: 0,
            ..Default::default()
        };
        let router = default_router().expect("router");
        let err = RealtimeEngine::new(realtime, &AuthConfig::default(), router)
            .expect_err("zero pong wait accepted");
        assert_eq!(err.kind, tether_core::error::ErrorKind::Configuration);
    }
}
