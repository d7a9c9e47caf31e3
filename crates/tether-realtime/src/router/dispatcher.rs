//! Immutable event-type → handler table.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use tether_core::error::AppError;
use tether_core::result::AppResult;

use super::context::{EventContext, EventHandler};
use crate::message::types::Event;

/// Collects handlers before serving begins.
#[derive(Default)]
pub struct EventRouterBuilder {
    handlers: HashMap<String, Arc<dyn EventHandler>>,
}

impl EventRouterBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `event_type`.
    ///
    /// Each tag may be registered once; a second registration is a
    /// configuration error.
    pub fn register<H>(mut self, event_type: impl Into<String>, handler: H) -> AppResult<Self>
    where
        H: EventHandler,
    {
        let event_type = event_type.into();
        if self.handlers.contains_key(&event_type) {
            return Err(AppError::configuration(format!(
                "Handler for event type '{event_type}' registered twice"
            )));
        }
        self.handlers.insert(event_type, Arc::new(handler));
        Ok(self)
    }

    /// Freezes the table.
    pub fn build(self) -> EventRouter {
        EventRouter {
            handlers: self.handlers,
        }
    }
}

/// Dispatches decoded events to their handler.
///
/// Built once by [`EventRouterBuilder`] and shared read-only afterwards.
pub struct EventRouter {
    handlers: HashMap<String, Arc<dyn EventHandler>>,
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("event_types", &self.event_types())
            .finish()
    }
}

impl EventRouter {
    /// Starts a new table.
    pub fn builder() -> EventRouterBuilder {
        EventRouterBuilder::new()
    }

    /// Runs the handler registered for `event.event_type`.
    ///
    /// Fails with `UnsupportedEventType` if there is none; otherwise returns
    /// whatever the handler returned.
    pub async fn route(&self, event: Event, ctx: &EventContext) -> AppResult<()> {
        let Some(handler) = self.handlers.get(&event.event_type) else {
            return Err(AppError::unsupported_event_type(&event.event_type));
        };
        debug!(
            conn_id = %ctx.connection.id(),
            event_type = %event.event_type,
            "Routing event"
        );
        handler.handle(event, ctx).await
    }

    /// Whether a handler exists for `event_type`.
    pub fn supports(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    /// Registered tags, sorted.
    pub fn event_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}
