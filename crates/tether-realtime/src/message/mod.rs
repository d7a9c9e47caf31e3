//! Wire envelope, JSON codec, and inbound validation.

pub mod serializer;
pub mod types;
pub mod validator;

pub use types::Event;
