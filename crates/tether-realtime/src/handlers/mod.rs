//! Built-in event handlers.

pub mod broadcast;
pub mod chat;

use tether_core::result::AppResult;

use crate::message::types::{EVENT_BROADCAST, EVENT_CHANGE_ROOM, EVENT_SEND_MESSAGE};
use crate::router::EventRouter;

pub use broadcast::BroadcastHandler;
pub use chat::{ChangeRoomHandler, SendMessageHandler};

/// The handler table the server runs with.
pub fn default_router() -> AppResult<EventRouter> {
    Ok(EventRouter::builder()
        .register(EVENT_BROADCAST, BroadcastHandler)?
        .register(EVENT_SEND_MESSAGE, SendMessageHandler)?
        .register(EVENT_CHANGE_ROOM, ChangeRoomHandler)?
        .build())
}
