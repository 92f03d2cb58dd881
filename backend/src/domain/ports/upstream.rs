//! Description of a call to another service and the ways it can fail.

use serde_json::Value;
use thiserror::Error;

/// An outbound HTTP request to a sibling service.
///
/// The method is kept as text so an unsupported verb surfaces as
/// [`UpstreamError::SetupFailed`] instead of being unrepresentable.
///
/// # Examples
/// ```
/// use microservice::domain::ports::UpstreamRequest;
///
/// let request = UpstreamRequest::get("http://health:3000/api/health/test")
///     .with_header("x-request-id", "abc")
///     .with_query("verbose", "true");
/// assert_eq!(request.method, "GET");
/// assert_eq!(request.query.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    /// HTTP verb, e.g. `GET`.
    pub method: String,
    /// Absolute URL of the target resource.
    pub url: String,
    /// Extra request headers, sent in order.
    pub headers: Vec<(String, String)>,
    /// Query string parameters, appended in order.
    pub query: Vec<(String, String)>,
    /// Optional JSON request body.
    pub body: Option<Value>,
}

impl UpstreamRequest {
    /// Build a request with no headers, query or body.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Shorthand for a `GET` request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Shorthand for a `POST` request carrying a JSON body.
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self::new("POST", url).with_body(body)
    }

    /// Append a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Append a query string parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Ways an outbound HTTP call can fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpstreamError {
    /// The upstream answered with a non-success status.
    #[error("upstream responded with status {status}")]
    Rejected {
        /// Status code returned by the upstream.
        status: u16,
        /// Response body, parsed as JSON when possible and kept as a string
        /// otherwise.
        body: Value,
    },
    /// The request was sent but no response arrived (refused, reset or timed out).
    #[error("no response received from upstream: {message}")]
    Unreachable { message: String },
    /// The request could not be constructed.
    #[error("error setting up upstream request: {message}")]
    SetupFailed { message: String },
    /// The upstream answered successfully but the body did not decode.
    #[error("upstream response could not be decoded: {message}")]
    InvalidBody { message: String },
}

impl UpstreamError {
    /// Build an [`UpstreamError::Rejected`].
    pub fn rejected(status: u16, body: Value) -> Self {
        Self::Rejected { status, body }
    }

    /// Build an [`UpstreamError::Unreachable`].
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    /// Build an [`UpstreamError::SetupFailed`].
    pub fn setup_failed(message: impl Into<String>) -> Self {
        Self::SetupFailed {
            message: message.into(),
        }
    }

    /// Build an [`UpstreamError::InvalidBody`].
    pub fn invalid_body(message: impl Into<String>) -> Self {
        Self::InvalidBody {
            message: message.into(),
        }
    }

    /// Whether a bounded number of retries is a reasonable remedy.
    ///
    /// Only a missing response qualifies. A rejection is the upstream's
    /// answer and a setup failure is a local bug; neither changes on retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}
