//! Connection registry: admission, lookup, fan-out, and removal.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use tether_auth::TokenStore;
use tether_core::config::RealtimeConfig;
use tether_core::error::AppError;
use tether_core::result::AppResult;
use tether_core::types::ConnectionId;

use super::handle::Connection;
use super::pump;
use super::transport::Transport;
use crate::message::types::Event;
use crate::metrics::RealtimeMetrics;
use crate::router::EventRouter;

/// Proof that a one-time token was presented and consumed.
///
/// Only [`ConnectionRegistry::authorize`] creates one, so a connection can
/// only be admitted after a successful token check.
#[derive(Debug)]
pub struct Admission {
    _consumed: (),
}

/// The authoritative set of live connections.
///
/// The map lock only guards lookups and membership changes; enqueueing onto
/// a connection always happens after the lock is released.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Arc<Connection>>>,
    tokens: Arc<TokenStore>,
    router: EventRouter,
    config: RealtimeConfig,
    metrics: Arc<RealtimeMetrics>,
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.len())
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}

impl ConnectionRegistry {
    /// Creates an empty registry, rejecting a config the pumps can't run with.
    pub fn new(
        tokens: Arc<TokenStore>,
        router: EventRouter,
        config: RealtimeConfig,
        metrics: Arc<RealtimeMetrics>,
    ) -> AppResult<Arc<Self>> {
        config.validate()?;
        Ok(Arc::new(Self {
            connections: RwLock::new(HashMap::new()),
            tokens,
            router,
            config,
            metrics,
        }))
    }

    /// Consumes `token`, failing with `Unauthorized` if it is missing,
    /// unknown, expired, or already used.
    pub fn authorize(&self, token: Option<&str>) -> AppResult<Admission> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Err(AppError::unauthorized("Missing admission token"));
        };
        if !self.tokens.verify_and_consume(token) {
            return Err(AppError::unauthorized("Invalid or expired admission token"));
        }
        Ok(Admission { _consumed: () })
    }

    /// Registers a connection over `transport` and starts its pumps.
    ///
    /// Returns as soon as the pumps are spawned.
    pub fn admit_authorized(
        self: &Arc<Self>,
        _admission: Admission,
        transport: Transport,
    ) -> Arc<Connection> {
        let (conn, outbound) = Connection::new(
            ConnectionId::new(),
            self.config.outbound_buffer_size,
            self.metrics.clone(),
        );

        // Registered before either pump runs, so their removal always finds it
        let total = {
            let mut map = self.connections.write();
            map.insert(conn.id(), conn.clone());
            map.len()
        };
        self.metrics.connection_opened();
        info!(conn_id = %conn.id(), total, "Connection admitted");

        pump::spawn(conn.clone(), transport, outbound, self.clone());
        conn
    }

    /// Checks `token` and admits the connection.
    ///
    /// On `Unauthorized` the transport is closed and nothing is registered.
    pub async fn admit(
        self: &Arc<Self>,
        transport: Transport,
        token: Option<&str>,
    ) -> AppResult<Arc<Connection>> {
        match self.authorize(token) {
            Ok(admission) => Ok(self.admit_authorized(admission, transport)),
            Err(err) => {
                debug!(error = %err, "Admission rejected");
                if let Err(close_err) = transport.close().await {
                    debug!(error = %close_err, "Rejected transport already closed");
                }
                Err(err)
            }
        }
    }

    /// Removes a connection and starts its teardown.
    ///
    /// Returns `false` if `id` was not registered; safe to call any number
    /// of times from any task.
    pub fn remove(&self, id: &ConnectionId) -> bool {
        let Some(conn) = self.connections.write().remove(id) else {
            return false;
        };
        conn.begin_close();
        self.metrics.connection_closed();
        info!(conn_id = %id, remaining = self.len(), "Connection removed");
        true
    }

    /// Look up a connection by ID.
    pub fn get(&self, id: &ConnectionId) -> Option<Arc<Connection>> {
        self.connections.read().get(id).cloned()
    }

    /// Snapshot of all live connections.
    pub fn connections(&self) -> Vec<Arc<Connection>> {
        self.connections.read().values().cloned().collect()
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    /// Whether no connections are live.
    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Enqueue `event` on every connection except `except`.
    ///
    /// Returns how many connections accepted it.
    pub fn broadcast(&self, event: &Event, except: Option<ConnectionId>) -> usize {
        self.send_where(event, |conn| Some(conn.id()) != except)
    }

    /// Enqueue `event` on every connection matching `filter`.
    pub fn send_where<F>(&self, event: &Event, filter: F) -> usize
    where
        F: Fn(&Connection) -> bool,
    {
        self.connections()
            .into_iter()
            .filter(|conn| filter(conn.as_ref()))
            .filter(|conn| conn.send(event.clone()))
            .count()
    }

    /// Enqueue `event` on a single connection.
    pub fn send_to(&self, id: &ConnectionId, event: Event) -> bool {
        match self.get(id) {
            Some(conn) => conn.send(event),
            None => false,
        }
    }

    /// Removes every connection. Each write pump flushes what is already
    /// queued, sends a close frame, and exits.
    pub fn close_all(&self) -> Vec<Arc<Connection>> {
        let drained: Vec<Arc<Connection>> =
            self.connections.write().drain().map(|(_, c)| c).collect();
        for conn in &drained {
            conn.begin_close();
            self.metrics.connection_closed();
        }
        if !drained.is_empty() {
            warn!(count = drained.len(), "Closing all connections");
        }
        drained
    }

    /// Handler table used by every read pump.
    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// Engine configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Engine metrics.
    pub fn metrics(&self) -> &Arc<RealtimeMetrics> {
        &self.metrics
    }
}
