//! Messaging client adapters and the transport gate choosing between them.

mod nats;
mod stub;

use std::sync::Arc;

pub use nats::NatsMessagingClient;
pub use stub::StubMessagingClient;

use crate::config::AppConfig;
use crate::domain::ports::{MessagingClient, TransportKind};

/// Build the messaging client for the configured environment.
///
/// The choice is made once; the returned client backs the gateway for the
/// lifetime of the process.
pub fn messaging_client_for(config: &AppConfig) -> Arc<dyn MessagingClient> {
    match TransportKind::for_environment(&config.app.environment) {
        TransportKind::Broker => Arc::new(NatsMessagingClient::new(&config.broker)),
        TransportKind::Stub => Arc::new(StubMessagingClient::new()),
    }
}
