//! Driven adapters implementing the domain ports.
//!
//! - `messaging`: NATS-backed and stub implementations of
//!   [`crate::domain::ports::MessagingClient`].
//! - `upstream`: reqwest client for calls to sibling services.

pub mod messaging;
pub mod upstream;
