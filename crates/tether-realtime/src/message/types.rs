//! The `{type, payload}` envelope exchanged over every connection.

use serde::{Deserialize, Serialize};

/// Client → server: broadcast a payload to every other connection.
pub const EVENT_BROADCAST: &str = "broadcast";
/// Client → server: post a chat message to the sender's room.
pub const EVENT_SEND_MESSAGE: &str = "send_message";
/// Server → client: a chat message posted in the recipient's room.
pub const EVENT_NEW_MESSAGE: &str = "new_message";
/// Client → server: move the sender to another room.
pub const EVENT_CHANGE_ROOM: &str = "change_room";

/// A single routed message.
///
/// Constructed per wire frame and never persisted. `payload` is opaque to
/// the engine; only the handler registered for `event_type` interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Routing tag.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Handler-specific data.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Event {
    /// Builds an event from a tag and any serializable payload.
    pub fn new(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }
}
