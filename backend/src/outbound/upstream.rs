//! Reqwest-backed client for calls to sibling services.
//!
//! This adapter owns transport details only: building the request, the
//! timeout, and mapping every way a call can fail onto [`UpstreamError`].

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::HttpClientSettings;
use crate::domain::ports::{UpstreamError, UpstreamRequest};

/// Outbound HTTP client shared by every handler.
///
/// Each request is bounded by the configured timeout; a request that
/// receives no answer in time resolves to [`UpstreamError::Unreachable`].
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
}

impl UpstreamClient {
    /// Build a client with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(settings: &HttpClientSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client })
    }

    /// Send `request` and decode a successful JSON response into `T`.
    ///
    /// An empty success body decodes as JSON `null`.
    ///
    /// # Errors
    ///
    /// - [`UpstreamError::SetupFailed`] when the method, URL or a header is
    ///   invalid.
    /// - [`UpstreamError::Unreachable`] when no response arrives.
    /// - [`UpstreamError::Rejected`] for any non-success status.
    /// - [`UpstreamError::InvalidBody`] when a success body does not decode.
    pub async fn send<T>(&self, request: UpstreamRequest) -> Result<T, UpstreamError>
    where
        T: DeserializeOwned,
    {
        let request = self.build(request)?;
        debug!(method = %request.method(), url = %request.url(), "Sending upstream request");

        let response = self
            .client
            .execute(request)
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;

        if !status.is_success() {
            return Err(UpstreamError::rejected(status.as_u16(), body_value(&body)));
        }
        decode_body(&body)
    }

    fn build(&self, request: UpstreamRequest) -> Result<reqwest::Request, UpstreamError> {
        let UpstreamRequest {
            method,
            url,
            headers,
            query,
            body,
        } = request;

        let method = Method::from_bytes(method.as_bytes()).map_err(|err| {
            UpstreamError::setup_failed(format!("invalid method '{method}': {err}"))
        })?;
        let mut url = Url::parse(&url)
            .map_err(|err| UpstreamError::setup_failed(format!("invalid url '{url}': {err}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let mut header_map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                UpstreamError::setup_failed(format!("invalid header name '{name}': {err}"))
            })?;
            let header_value = HeaderValue::from_str(&value).map_err(|err| {
                UpstreamError::setup_failed(format!("invalid value for header '{name}': {err}"))
            })?;
            header_map.append(header_name, header_value);
        }

        let mut builder = self.client.request(method, url).headers(header_map);
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        builder
            .build()
            .map_err(|err| UpstreamError::setup_failed(err.to_string()))
    }
}

fn map_transport_error(error: reqwest::Error) -> UpstreamError {
    if error.is_builder() {
        UpstreamError::setup_failed(error.to_string())
    } else {
        UpstreamError::unreachable(error.to_string())
    }
}

/// Rejection bodies are kept verbatim: JSON when it parses, text otherwise.
fn body_value(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, UpstreamError> {
    let decoded = if body.is_empty() {
        serde_json::from_value(Value::Null)
    } else {
        serde_json::from_slice(body)
    };
    decoded.map_err(|err| UpstreamError::invalid_body(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use rstest::{fixture, rstest};
    use serde::Deserialize;
    use serde_json::json;
    use std::time::Duration;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Greeting {
        message: String,
    }

    #[fixture]
    fn client() -> UpstreamClient {
        UpstreamClient::new(&HttpClientSettings {
            timeout: Duration::from_secs(2),
        })
        .expect("client builds")
    }

    #[rstest]
    #[tokio::test]
    async fn success_bodies_decode_into_the_requested_type(client: UpstreamClient) {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/health/test")
            .match_header("x-request-id", "abc")
            .match_query(Matcher::UrlEncoded("verbose".into(), "true".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"Hello World!"}"#)
            .create_async()
            .await;

        let request = UpstreamRequest::get(format!("{}/api/health/test", server.url()))
            .with_header("x-request-id", "abc")
            .with_query("verbose", "true");
        let greeting: Greeting = client.send(request).await.expect("request succeeds");

        assert_eq!(greeting.message, "Hello World!");
        mock.assert_async().await;
    }

    #[rstest]
    #[tokio::test]
    async fn json_bodies_are_sent_with_the_request(client: UpstreamClient) {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/items")
            .match_body(Matcher::Json(json!({"name": "widget"})))
            .with_status(204)
            .create_async()
            .await;

        let request =
            UpstreamRequest::post(format!("{}/items", server.url()), json!({"name": "widget"}));
        let value: Value = client.send(request).await.expect("request succeeds");

        assert_eq!(value, Value::Null);
        mock.assert_async().await;
    }

    #[rstest]
    #[case::json(
        404,
        r#"{"statusCode":404,"message":"User not found"}"#,
        json!({"statusCode": 404, "message": "User not found"})
    )]
    #[case::text(500, "upstream exploded", json!("upstream exploded"))]
    #[case::empty(503, "", Value::Null)]
    #[tokio::test]
    async fn error_statuses_are_rejected_with_the_body_verbatim(
        client: UpstreamClient,
        #[case] status: usize,
        #[case] body: &str,
        #[case] expected: Value,
    ) {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/7")
            .with_status(status)
            .with_body(body)
            .create_async()
            .await;

        let result: Result<Value, _> = client
            .send(UpstreamRequest::get(format!("{}/users/7", server.url())))
            .await;

        assert_eq!(
            result,
            Err(UpstreamError::Rejected {
                status: u16::try_from(status).expect("status fits"),
                body: expected,
            })
        );
    }

    #[rstest]
    #[tokio::test]
    async fn undecodable_success_bodies_are_invalid(client: UpstreamClient) {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/greeting")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let result: Result<Greeting, _> = client
            .send(UpstreamRequest::get(format!("{}/greeting", server.url())))
            .await;

        assert!(matches!(result, Err(UpstreamError::InvalidBody { .. })));
    }

    #[rstest]
    #[case::method(UpstreamRequest::new("NOT A METHOD", "http://localhost/"))]
    #[case::url(UpstreamRequest::get("not a url"))]
    #[case::header_name(UpstreamRequest::get("http://localhost/").with_header("bad header", "x"))]
    #[case::header_value(
        UpstreamRequest::get("http://localhost/").with_header("x-note", "line\nbreak")
    )]
    #[tokio::test]
    async fn malformed_requests_fail_setup(
        client: UpstreamClient,
        #[case] request: UpstreamRequest,
    ) {
        let result: Result<Value, _> = client.send(request).await;
        assert!(
            matches!(result, Err(UpstreamError::SetupFailed { .. })),
            "expected setup failure, got {result:?}"
        );
    }

    #[rstest]
    #[tokio::test]
    async fn refused_connections_are_unreachable(client: UpstreamClient) {
        let result: Result<Value, _> = client
            .send(UpstreamRequest::get("http://127.0.0.1:1/health"))
            .await;

        assert!(
            matches!(result, Err(UpstreamError::Unreachable { .. })),
            "expected unreachable, got {result:?}"
        );
    }

    #[tokio::test]
    async fn silent_upstreams_time_out_as_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local address");
        // Accept connections and hold them open without ever answering.
        let silent = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        let client = UpstreamClient::new(&HttpClientSettings {
            timeout: Duration::from_millis(300),
        })
        .expect("client builds");

        let started = std::time::Instant::now();
        let result: Result<Value, _> = client
            .send(UpstreamRequest::get(format!("http://{addr}/health")))
            .await;

        assert!(
            matches!(result, Err(UpstreamError::Unreachable { .. })),
            "expected unreachable, got {result:?}"
        );
        assert!(started.elapsed() < Duration::from_secs(3));
        silent.abort();
    }

    #[rstest]
    #[case(b"".as_slice(), Value::Null)]
    #[case(br#"{"a":1}"#.as_slice(), json!({"a": 1}))]
    #[case(b"plain".as_slice(), json!("plain"))]
    fn rejection_bodies_keep_their_shape(#[case] body: &[u8], #[case] expected: Value) {
        assert_eq!(body_value(body), expected);
    }
}
