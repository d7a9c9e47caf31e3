//! Fan-out to every other connection.

use async_trait::async_trait;
use tracing::debug;

use tether_core::result::AppResult;

use crate::message::types::Event;
use crate::router::{EventContext, EventHandler};

/// Re-emits the event unchanged to every connection except the sender.
#[derive(Debug, Clone, Copy, Default)]
pub struct BroadcastHandler;

#[async_trait]
impl EventHandler for BroadcastHandler {
    async fn handle(&self, event: Event, ctx: &EventContext) -> AppResult<()> {
        let delivered = ctx
            .registry
            .broadcast(&event, Some(ctx.connection.id()));
        debug!(conn_id = %ctx.connection.id(), delivered, "Broadcast");
        Ok(())
    }
}
