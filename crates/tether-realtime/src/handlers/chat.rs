//! Room-scoped chat: posting messages and switching rooms.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tether_core::error::AppError;
use tether_core::result::AppResult;

use crate::message::types::{EVENT_NEW_MESSAGE, Event};
use crate::router::{EventContext, EventHandler};

/// Payload of `send_message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessagePayload {
    pub message: String,
    pub from: String,
}

/// Payload of `new_message`, stamped with the server time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessagePayload {
    pub message: String,
    pub from: String,
    pub sent: DateTime<Utc>,
}

/// Payload of `change_room`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRoomPayload {
    pub name: String,
}

fn parse_payload<T: DeserializeOwned>(event: &Event) -> AppResult<T> {
    serde_json::from_value(event.payload.clone()).map_err(|e| {
        AppError::handler(format!("Bad payload for '{}': {e}", event.event_type))
    })
}

/// Delivers a chat message to everyone in the sender's room, sender included.
#[derive(Debug, Clone, Copy, Default)]
pub struct SendMessageHandler;

#[async_trait]
impl EventHandler for SendMessageHandler {
    async fn handle(&self, event: Event, ctx: &EventContext) -> AppResult<()> {
        let payload: SendMessagePayload = parse_payload(&event)?;

        let outgoing = NewMessagePayload {
            message: payload.message,
            from: payload.from,
            sent: Utc::now(),
        };
        let outgoing = serde_json::to_value(&outgoing)
            .map_err(|e| AppError::handler(format!("Failed to build new_message: {e}")))?;

        let room = ctx.connection.room();
        let delivered = ctx
            .registry
            .send_where(&Event::new(EVENT_NEW_MESSAGE, outgoing), |conn| conn.room() == room);
        debug!(conn_id = %ctx.connection.id(), room = %room, delivered, "Chat message delivered");
        Ok(())
    }
}

/// Moves the sender into another room.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeRoomHandler;

#[async_trait]
impl EventHandler for ChangeRoomHandler {
    async fn handle(&self, event: Event, ctx: &EventContext) -> AppResult<()> {
        let payload: ChangeRoomPayload = parse_payload(&event)?;
        let name = payload.name.trim();
        if name.is_empty() {
            return Err(AppError::handler("Room name must not be empty"));
        }

        ctx.connection.set_room(name);
        debug!(conn_id = %ctx.connection.id(), room = name, "Changed room");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use tether_core::error::ErrorKind;

    use super::*;
    use crate::connection::registry::tests::{attach, registry_with};
    use crate::router::EventRouter;

    #[tokio::test]
    async fn test_send_message_stays_in_room() {
        let (registry, _) = registry_with(EventRouter::builder().build());
        let (sender, mut sender_rx) = attach(&registry);
        let (_roommate, mut roommate_rx) = attach(&registry);
        let (elsewhere, mut elsewhere_rx) = attach(&registry);
        elsewhere.set_room("other");

        let ctx = EventContext::new(sender, registry);
        let event = Event::new("send_message", json!({"message": "hi", "from": "percy"}));
        SendMessageHandler.handle(event, &ctx).await.expect("handle");

        for rx in [&mut sender_rx, &mut roommate_rx] {
            let got = rx.try_recv().expect("delivered");
            assert_eq!(got.event_type, EVENT_NEW_MESSAGE);
            let payload: NewMessagePayload = serde_json::from_value(got.payload).expect("payload");
            assert_eq!(payload.message, "hi");
            assert_eq!(payload.from, "percy");
        }
        assert!(elsewhere_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_message_rejects_bad_payload() {
        let (_registry, ctx) = registry_with(EventRouter::builder().build());
        let err = SendMessageHandler
            .handle(Event::new("send_message", json!({"msg": 1})), &ctx)
            .await
            .expect_err("accepted bad payload");
        assert_eq!(err.kind, ErrorKind::Handler);
    }

    #[tokio::test]
    async fn test_change_room() {
        let (_registry, ctx) = registry_with(EventRouter::builder().build());

        ChangeRoomHandler
            .handle(Event::new("change_room", json!({"name": "rust"})), &ctx)
            .await
            .expect("handle");
        assert_eq!(ctx.connection.room(), "rust");

        let err = ChangeRoomHandler
            .handle(Event::new("change_room", json!({"name": "  "})), &ctx)
            .await
            .expect_err("empty room accepted");
        assert_eq!(err.kind, ErrorKind::Handler);
        assert_eq!(ctx.connection.room(), "rust");
    }
}
