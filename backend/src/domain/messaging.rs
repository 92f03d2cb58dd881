//! Messaging gateway: fire-and-forget publication over a swappable client.
//!
//! Call sites publish through [`MessagingGateway`] and never learn whether a
//! broker is attached. Failures stay inside the gateway: they are logged and
//! reported as [`PublishOutcome::Failed`], never as errors, so a broken
//! broker cannot fail the request that tried to publish.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use super::ports::{Delivery, MessagingClient, TransportKind};

/// Result of a publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PublishOutcome {
    /// The broker accepted the message.
    Published,
    /// The stub transport dropped the message.
    Discarded,
    /// Encoding or delivery failed; the failure was logged.
    Failed,
}

/// Publishes messages through the client selected at startup.
#[derive(Clone)]
pub struct MessagingGateway {
    client: Arc<dyn MessagingClient>,
}

impl MessagingGateway {
    /// Wrap a messaging client.
    pub fn new(client: Arc<dyn MessagingClient>) -> Self {
        Self { client }
    }

    /// Transport backing this gateway.
    #[must_use]
    pub fn transport(&self) -> TransportKind {
        self.client.kind()
    }

    /// Open the client connection. Failure is logged and startup continues.
    pub async fn connect(&self) {
        let transport = self.transport();
        match self.client.connect().await {
            Ok(()) if transport == TransportKind::Broker => {
                info!("Connected to the message broker");
            }
            Ok(()) => info!(?transport, "Messaging disabled; publishes will be discarded"),
            Err(err) => error!(error = %err, "Failed to connect to the message broker"),
        }
    }

    /// Serialise `payload` as JSON and publish it under `topic`.
    ///
    /// Never fails: every problem is logged and folded into
    /// [`PublishOutcome::Failed`].
    pub async fn publish<T>(&self, topic: &str, payload: &T) -> PublishOutcome
    where
        T: Serialize + ?Sized,
    {
        let encoded = match serde_json::to_vec(payload) {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(topic, error = %err, "Failed to encode message payload");
                return PublishOutcome::Failed;
            }
        };

        match self.client.emit(topic, encoded).await {
            Ok(Delivery::Sent) => PublishOutcome::Published,
            Ok(Delivery::Discarded) => PublishOutcome::Discarded,
            Err(err) => {
                error!(topic, error = %err, "Failed to publish message");
                PublishOutcome::Failed
            }
        }
    }

    /// Log messages arriving under `topic`. Failure is logged and ignored.
    pub async fn listen(&self, topic: &str) {
        if let Err(err) = self.client.listen(topic).await {
            warn!(topic, error = %err, "Failed to subscribe to topic");
        }
    }

    /// Flush and release the client. Safe to call more than once.
    pub async fn close(&self) {
        if let Err(err) = self.client.close().await {
            warn!(error = %err, "Failed to close the messaging client cleanly");
        }
    }
}

impl std::fmt::Debug for MessagingGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagingGateway")
            .field("transport", &self.transport())
            .finish()
    }
}
