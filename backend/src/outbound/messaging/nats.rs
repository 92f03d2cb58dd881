//! NATS-backed messaging client.
//!
//! Messages are published core-NATS style on `{queue}.{topic}` and flushed
//! before the publish returns, so a call completes once the broker has the
//! message but without waiting on any consumer. Each round-trip is bounded
//! by the publish timeout: while the broker is gone the client queues
//! commands for a reconnect that may never come.

use std::time::Duration;

use async_nats::ConnectOptions;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{BrokerSettings, Secret};
use crate::domain::ports::{Delivery, MessagingClient, MessagingError, TransportKind};

/// Messaging client holding one shared NATS connection.
///
/// The connection handle is cloned out of the lock before any I/O, so
/// concurrent publishes never wait on each other here; the NATS client
/// serialises writes internally.
#[derive(Debug)]
pub struct NatsMessagingClient {
    url: String,
    username: String,
    password: Secret,
    queue: String,
    connect_timeout: Duration,
    publish_timeout: Duration,
    drain_timeout: Duration,
    connection: RwLock<Option<async_nats::Client>>,
    listeners: Mutex<Vec<JoinHandle<()>>>,
}

impl NatsMessagingClient {
    /// Prepare a client for the configured broker. No connection is opened
    /// until [`MessagingClient::connect`] is called.
    pub fn new(settings: &BrokerSettings) -> Self {
        Self {
            url: settings.url(),
            username: settings.username.clone(),
            password: settings.password.clone(),
            queue: settings.queue.clone(),
            connect_timeout: settings.connect_timeout,
            publish_timeout: settings.publish_timeout,
            drain_timeout: settings.drain_timeout,
            connection: RwLock::new(None),
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn subject(&self, topic: &str) -> String {
        format!("{}.{}", self.queue, topic)
    }

    async fn connection(&self) -> Result<async_nats::Client, MessagingError> {
        self.connection
            .read()
            .await
            .clone()
            .ok_or(MessagingError::NotConnected)
    }
}

#[async_trait]
impl MessagingClient for NatsMessagingClient {
    fn kind(&self) -> TransportKind {
        TransportKind::Broker
    }

    async fn connect(&self) -> Result<(), MessagingError> {
        if self.connection.read().await.is_some() {
            return Ok(());
        }

        info!(url = %self.url, timeout_ms = self.connect_timeout.as_millis(), "Connecting to NATS");
        let client = ConnectOptions::with_user_and_password(
            self.username.clone(),
            self.password.expose().to_owned(),
        )
        .connection_timeout(self.connect_timeout)
        .connect(self.url.as_str())
        .await
        .map_err(|err| MessagingError::unavailable(err.to_string()))?;

        *self.connection.write().await = Some(client);
        Ok(())
    }

    async fn emit(&self, topic: &str, payload: Vec<u8>) -> Result<Delivery, MessagingError> {
        let client = self.connection().await?;
        let subject = self.subject(topic);
        let round_trip = async {
            client
                .publish(subject, Bytes::from(payload))
                .await
                .map_err(|err| MessagingError::rejected(err.to_string()))?;
            client
                .flush()
                .await
                .map_err(|err| MessagingError::unavailable(err.to_string()))
        };

        tokio::time::timeout(self.publish_timeout, round_trip)
            .await
            .map_err(|_| {
                MessagingError::unavailable(format!(
                    "broker did not acknowledge the publish within {}ms",
                    self.publish_timeout.as_millis()
                ))
            })??;
        Ok(Delivery::Sent)
    }

    async fn listen(&self, topic: &str) -> Result<(), MessagingError> {
        let client = self.connection().await?;
        let subject = self.subject(topic);
        let mut subscriber = client
            .subscribe(subject.clone())
            .await
            .map_err(|err| MessagingError::unavailable(err.to_string()))?;

        info!(%subject, "Listening for messages");
        let handle = tokio::spawn(async move {
            while let Some(message) = subscriber.next().await {
                info!(
                    subject = %message.subject,
                    payload = %String::from_utf8_lossy(&message.payload),
                    "Received message"
                );
            }
        });
        self.listeners.lock().await.push(handle);
        Ok(())
    }

    async fn close(&self) -> Result<(), MessagingError> {
        for listener in self.listeners.lock().await.drain(..) {
            listener.abort();
        }
        let Some(client) = self.connection.write().await.take() else {
            return Ok(());
        };

        info!(timeout_ms = self.drain_timeout.as_millis(), "Closing NATS connection");
        match tokio::time::timeout(self.drain_timeout, client.flush()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(MessagingError::unavailable(err.to_string())),
            Err(_) => {
                warn!("Timed out flushing pending messages; closing anyway");
                Err(MessagingError::unavailable(
                    "drain window elapsed before pending messages were flushed",
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::app_config;
    use rstest::{fixture, rstest};
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const SHORT: Duration = Duration::from_millis(200);
    const GRACE: Duration = Duration::from_secs(3);

    fn settings_for_port(port: u16) -> BrokerSettings {
        let mut settings = app_config("local").broker;
        settings.host = "127.0.0.1".to_owned();
        settings.port = port;
        settings.connect_timeout = Duration::from_secs(2);
        settings.publish_timeout = SHORT;
        settings.drain_timeout = SHORT;
        settings
    }

    #[fixture]
    fn client() -> NatsMessagingClient {
        let mut settings = settings_for_port(1);
        settings.connect_timeout = SHORT;
        NatsMessagingClient::new(&settings)
    }

    /// Accept one client, complete the NATS handshake, then drop both the
    /// connection and the listener so every reconnect attempt fails.
    async fn vanishing_broker() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
        let port = listener.local_addr().expect("local address").port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept client");
            let info = format!(
                "INFO {{\"server_id\":\"test\",\"server_name\":\"test\",\"version\":\"2.10.0\",\
                 \"go\":\"go1.22\",\"host\":\"127.0.0.1\",\"port\":{port},\"headers\":true,\
                 \"auth_required\":false,\"max_payload\":1048576,\"proto\":1}}\r\n"
            );
            socket.write_all(info.as_bytes()).await.expect("send INFO");

            let mut seen = Vec::new();
            let mut buf = [0_u8; 1024];
            while !String::from_utf8_lossy(&seen).contains("PING\r\n") {
                let read = socket.read(&mut buf).await.expect("read handshake");
                if read == 0 {
                    return;
                }
                seen.extend_from_slice(&buf[..read]);
            }
            socket.write_all(b"PONG\r\n").await.expect("send PONG");
        });
        port
    }

    async fn connected_to_vanishing_broker() -> NatsMessagingClient {
        let port = vanishing_broker().await;
        let client = NatsMessagingClient::new(&settings_for_port(port));
        client.connect().await.expect("handshake completes");
        client
    }

    #[rstest]
    fn topics_are_routed_under_the_queue(client: NatsMessagingClient) {
        assert_eq!(client.subject("hello"), "users.hello");
    }

    #[rstest]
    #[tokio::test]
    async fn emitting_before_connect_is_rejected(client: NatsMessagingClient) {
        let result = client.emit("hello", b"{}".to_vec()).await;
        assert_eq!(result, Err(MessagingError::NotConnected));
    }

    #[rstest]
    #[tokio::test]
    async fn closing_an_unconnected_client_is_a_no_op(client: NatsMessagingClient) {
        assert_eq!(client.close().await, Ok(()));
        assert_eq!(client.close().await, Ok(()));
    }

    #[rstest]
    #[tokio::test]
    async fn unreachable_brokers_report_unavailable(client: NatsMessagingClient) {
        let result = client.connect().await;

        assert!(
            matches!(result, Err(MessagingError::Unavailable { .. })),
            "expected unavailable, got {result:?}"
        );
        assert_eq!(
            client.emit("hello", b"{}".to_vec()).await,
            Err(MessagingError::NotConnected)
        );
    }

    #[rstest]
    fn debug_output_redacts_the_password(client: NatsMessagingClient) {
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("broker-password"));
    }

    #[tokio::test]
    async fn publishing_to_a_lost_broker_gives_up_after_the_publish_timeout() {
        let client = connected_to_vanishing_broker().await;

        let started = Instant::now();
        let result = tokio::time::timeout(GRACE, client.emit("hello", b"{}".to_vec()))
            .await
            .expect("emit is bounded by the publish timeout");

        assert!(result.is_err(), "expected a failed publish, got {result:?}");
        assert!(started.elapsed() < GRACE);
    }

    #[tokio::test]
    async fn closing_a_connected_client_respects_the_drain_window() {
        let client = connected_to_vanishing_broker().await;

        let started = Instant::now();
        let result = tokio::time::timeout(GRACE, client.close())
            .await
            .expect("close is bounded by the drain window");

        assert!(started.elapsed() < GRACE);
        assert!(
            matches!(result, Ok(()) | Err(MessagingError::Unavailable { .. })),
            "unexpected close result {result:?}"
        );
        assert_eq!(client.close().await, Ok(()));
    }

    #[rstest]
    #[tokio::test]
    async fn listening_requires_a_connection(client: NatsMessagingClient) {
        assert_eq!(client.listen("hello").await, Err(MessagingError::NotConnected));
    }
}
