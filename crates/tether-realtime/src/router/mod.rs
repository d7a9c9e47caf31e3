//! Event routing: handler trait, per-event context, and the dispatch table.

pub mod context;
pub mod dispatcher;

pub use context::{EventContext, EventHandler};
pub use dispatcher::{EventRouter, EventRouterBuilder};
