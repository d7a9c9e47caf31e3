//! What a handler sees when an event is dispatched to it.

use std::sync::Arc;

use async_trait::async_trait;

use tether_core::result::AppResult;

use crate::connection::handle::Connection;
use crate::connection::registry::ConnectionRegistry;
use crate::message::types::Event;

/// Processes one event type.
///
/// Handlers may be invoked concurrently from different connections' read
/// pumps, so implementations must not assume exclusive access to anything
/// they share.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Handles `event`, which arrived on `ctx.connection`.
    async fn handle(&self, event: Event, ctx: &EventContext) -> AppResult<()>;
}

/// The originating connection plus the registry, for fan-out.
#[derive(Debug, Clone)]
pub struct EventContext {
    /// Connection the event was read from.
    pub connection: Arc<Connection>,
    /// Registry holding every live connection.
    pub registry: Arc<ConnectionRegistry>,
}

impl EventContext {
    /// Creates a context for an event read from `connection`.
    pub fn new(connection: Arc<Connection>, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            connection,
            registry,
        }
    }
}
