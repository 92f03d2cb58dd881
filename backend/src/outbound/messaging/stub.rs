//! No-op messaging client used outside the broker environment.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::ports::{Delivery, MessagingClient, MessagingError, TransportKind};

/// Messaging client that accepts and discards every message without
/// touching the network.
#[derive(Debug, Clone, Default)]
pub struct StubMessagingClient;

impl StubMessagingClient {
    /// Create a new stub client.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MessagingClient for StubMessagingClient {
    fn kind(&self) -> TransportKind {
        TransportKind::Stub
    }

    async fn connect(&self) -> Result<(), MessagingError> {
        Ok(())
    }

    async fn emit(&self, topic: &str, payload: Vec<u8>) -> Result<Delivery, MessagingError> {
        debug!(topic, bytes = payload.len(), "Messaging disabled; message discarded");
        Ok(Delivery::Discarded)
    }

    async fn listen(&self, topic: &str) -> Result<(), MessagingError> {
        debug!(topic, "Messaging disabled; nothing to listen to");
        Ok(())
    }

    async fn close(&self) -> Result<(), MessagingError> {
        Ok(())
    }
}
