//! Domain port for fire-and-forget message publication.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::Environment;

/// Errors surfaced by a messaging client adapter.
///
/// These never leave the [`crate::domain::MessagingGateway`]; it logs them
/// and reports a failed publish instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagingError {
    /// The broker could not be reached or the connection dropped.
    #[error("message broker is unavailable: {message}")]
    Unavailable { message: String },
    /// The broker refused the message.
    #[error("message was rejected by the broker: {message}")]
    Rejected { message: String },
    /// A publish was attempted before a successful connect.
    #[error("messaging client is not connected")]
    NotConnected,
}

impl MessagingError {
    /// Build a [`MessagingError::Unavailable`].
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Build a [`MessagingError::Rejected`].
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

/// What a client did with a message it accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the broker and flushed.
    Sent,
    /// Dropped because the transport is disabled.
    Discarded,
}

/// Transport backing the messaging gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// A live broker connection.
    Broker,
    /// A no-op stand-in used outside the broker environment.
    Stub,
}

impl TransportKind {
    /// Select the transport for a deployment environment.
    ///
    /// Only the `local` environment talks to the broker.
    ///
    /// ```
    /// use microservice::config::Environment;
    /// use microservice::domain::ports::TransportKind;
    ///
    /// let local = Environment::new("local");
    /// let production = Environment::new("production");
    /// assert_eq!(TransportKind::for_environment(&local), TransportKind::Broker);
    /// assert_eq!(TransportKind::for_environment(&production), TransportKind::Stub);
    /// ```
    #[must_use]
    pub fn for_environment(environment: &Environment) -> Self {
        if environment.enables_broker() {
            Self::Broker
        } else {
            Self::Stub
        }
    }
}

/// A client able to publish opaque payloads under a topic.
///
/// Implementations must be safe to share between concurrent requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Transport this client represents.
    fn kind(&self) -> TransportKind;

    /// Open the underlying connection.
    async fn connect(&self) -> Result<(), MessagingError>;

    /// Publish an encoded payload under `topic`.
    async fn emit(&self, topic: &str, payload: Vec<u8>) -> Result<Delivery, MessagingError>;

    /// Log every message received under `topic` until the client closes.
    async fn listen(&self, topic: &str) -> Result<(), MessagingError>;

    /// Flush pending messages and release the connection. Calling this more
    /// than once is a no-op.
    async fn close(&self) -> Result<(), MessagingError>;
}
