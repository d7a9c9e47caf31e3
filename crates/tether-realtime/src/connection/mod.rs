//! Connection lifecycle: transport, handle, pumps, and the registry.

pub mod handle;
pub mod pump;
pub mod registry;
pub mod transport;
