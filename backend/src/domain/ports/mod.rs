//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Ports describe how the domain expects to interact with driven adapters
//! (the message broker and other services over HTTP). Each exposes strongly
//! typed errors so adapters map their failures into predictable variants.

mod messaging_client;
mod upstream;

#[cfg(test)]
pub use messaging_client::MockMessagingClient;
pub use messaging_client::{Delivery, MessagingClient, MessagingError, TransportKind};
pub use upstream::{UpstreamError, UpstreamRequest};
