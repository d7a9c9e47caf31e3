//! # tether-realtime
//!
//! Connection lifecycle and concurrency engine for the Tether hub:
//!
//! - Connection registry with token-gated admission and exactly-once removal
//! - Per-connection read/write pumps with a ping/pong keepalive
//! - Event router dispatching `{type, payload}` envelopes to registered handlers
//! - Built-in handlers (`broadcast`, `send_message`, `change_room`)
//! - Engine-level metrics counters

pub mod connection;
pub mod handlers;
pub mod message;
pub mod metrics;
pub mod router;
pub mod server;

pub use connection::handle::{Connection, ConnectionInfo, ConnectionState};
pub use connection::registry::{Admission, ConnectionRegistry};
pub use connection::transport::{Frame, Transport, TransportError};
pub use message::types::Event;
pub use metrics::RealtimeMetrics;
pub use router::{EventContext, EventHandler, EventRouter, EventRouterBuilder};
pub use server::RealtimeEngine;
