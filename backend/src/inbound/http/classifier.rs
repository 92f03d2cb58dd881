//! Failure classifier: the single place failures become error envelopes.
//!
//! Every failure that reaches the HTTP boundary is mapped here onto a status
//! code, a client-facing message and optional per-field details. The
//! classifier never fails; a failure without a usable message falls back to
//! a generic one.
//!
//! | Failure | Status | Message |
//! |---|---|---|
//! | [`AppError`] | by [`ErrorCode`] | declared message |
//! | `Rejected` | upstream status, 502 if not an error status | upstream body message |
//! | `Unreachable` | 504 | `No response received` |
//! | `SetupFailed` | 500 | `Error setting up request` |
//! | `InvalidBody` | 502 | `Invalid response from upstream service` |
//! | framework error with a 4xx status | that status | its own message |
//! | bare 4xx/5xx response | that status | canonical reason phrase |
//! | anything else | 500 | its own message |

use std::backtrace::BacktraceStatus;
use std::error::Error as StdError;
use std::sync::Arc;

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use chrono::SecondsFormat;
use mockable::{Clock, DefaultClock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::config::Environment;
use crate::domain::ports::UpstreamError;
use crate::domain::{AppError, ErrorCode, Failure, FieldViolation};

/// Message used whenever a failure carries no usable message of its own.
pub const FALLBACK_MESSAGE: &str = "Unexpected error occurred";
const UNREACHABLE_MESSAGE: &str = "No response received";
const SETUP_FAILED_MESSAGE: &str = "Error setting up request";
const INVALID_BODY_MESSAGE: &str = "Invalid response from upstream service";

/// Shape of every failed API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    /// HTTP status of the response.
    #[schema(example = 404)]
    pub status_code: u16,
    /// Details of the failure.
    pub error: ErrorBody,
}

/// Body of an [`ErrorEnvelope`].
///
/// ## Invariants
/// - `code` equals the envelope's `statusCode`.
/// - `debug` is only present when the process runs in development.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[schema(example = 404)]
    pub code: u16,
    /// Path and query of the failed request.
    #[schema(example = "/api/user/test/test-microservice-communication")]
    pub url_path: String,
    /// RFC 3339 UTC timestamp with millisecond precision.
    #[schema(example = "2024-05-01T12:00:00.000Z")]
    pub timestamp: String,
    #[schema(example = "User not found")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldViolation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugInfo>,
}

/// Diagnostic detail exposed in development only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DebugInfo {
    /// Error text, its cause chain and, when captured, a backtrace.
    pub stack: String,
}

impl ErrorEnvelope {
    /// HTTP status carried by the envelope.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Render the envelope as a JSON response.
    #[must_use]
    pub fn into_response(self) -> HttpResponse {
        HttpResponse::build(self.status()).json(self)
    }
}

/// Status, message and details chosen for a failure, before the request
/// context is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Classification {
    pub(crate) status: StatusCode,
    message: String,
    details: Vec<FieldViolation>,
}

impl Classification {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: Vec::new(),
        }
    }

    fn with_details(mut self, details: Vec<FieldViolation>) -> Self {
        self.details = details;
        self
    }
}

/// HTTP status for an application error code.
#[must_use]
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::ValidationFailed => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn classify_failure(failure: &Failure) -> Classification {
    match failure {
        Failure::Application(err) => classify_application(err),
        Failure::Upstream(err) => classify_upstream(err),
        Failure::Internal(err) => {
            Classification::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn classify_application(err: &AppError) -> Classification {
    Classification::new(status_for(err.code()), err.message()).with_details(err.details().to_vec())
}

fn classify_upstream(err: &UpstreamError) -> Classification {
    match err {
        UpstreamError::Rejected { status, body } => {
            let status = StatusCode::from_u16(*status)
                .ok()
                .filter(|status| status.is_client_error() || status.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY);
            Classification::new(status, upstream_message(body).unwrap_or_default())
                .with_details(upstream_details(body))
        }
        UpstreamError::Unreachable { .. } => {
            Classification::new(StatusCode::GATEWAY_TIMEOUT, UNREACHABLE_MESSAGE)
        }
        UpstreamError::SetupFailed { .. } => {
            Classification::new(StatusCode::INTERNAL_SERVER_ERROR, SETUP_FAILED_MESSAGE)
        }
        UpstreamError::InvalidBody { .. } => {
            Classification::new(StatusCode::BAD_GATEWAY, INVALID_BODY_MESSAGE)
        }
    }
}

/// Find the human-readable message in an upstream error body.
///
/// Looks at `error.message` (a sibling service using this envelope), then
/// `message` (a string or a list of strings), then the body itself when it
/// is a bare string.
fn upstream_message(body: &Value) -> Option<String> {
    body.pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .or_else(|| body.get("message").and_then(message_text))
        .or_else(|| body.as_str().map(str::to_owned))
        .filter(|message| !message.trim().is_empty())
}

fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        _ => None,
    }
}

fn upstream_details(body: &Value) -> Vec<FieldViolation> {
    body.pointer("/error/details")
        .and_then(|details| serde_json::from_value(details.clone()).ok())
        .unwrap_or_default()
}

fn failure_kind(failure: &Failure) -> &'static str {
    match failure {
        Failure::Application(_) => "ApplicationError",
        Failure::Upstream(_) => "UpstreamError",
        Failure::Internal(_) => "InternalFailure",
    }
}

fn failure_stack(failure: &Failure) -> String {
    let mut lines = vec![format!("{}: {failure}", failure_kind(failure))];
    let mut next = failure.source();
    while let Some(cause) = next {
        lines.push(format!("caused by: {cause}"));
        next = cause.source();
    }
    if let Failure::Internal(internal) = failure {
        let backtrace = internal.backtrace();
        if backtrace.status() == BacktraceStatus::Captured {
            lines.push(backtrace.to_string());
        }
    }
    lines.join("\n")
}

/// Turns failures into [`ErrorEnvelope`]s stamped with the request path and
/// the current time.
#[derive(Clone)]
pub struct Classifier {
    clock: Arc<dyn Clock>,
    expose_debug: bool,
}

impl Classifier {
    /// Create a classifier. `expose_debug` controls whether envelopes carry
    /// `debug.stack`.
    pub fn new(clock: Arc<dyn Clock>, expose_debug: bool) -> Self {
        Self {
            clock,
            expose_debug,
        }
    }

    /// Classifier for a deployment environment; debug detail is exposed in
    /// development only.
    #[must_use]
    pub fn for_environment(environment: &Environment) -> Self {
        Self::new(Arc::new(DefaultClock), environment.is_development())
    }

    /// Classify a handler failure.
    #[must_use]
    pub fn classify(&self, failure: &Failure, url_path: &str) -> ErrorEnvelope {
        let stack = self.expose_debug.then(|| failure_stack(failure));
        self.envelope(classify_failure(failure), url_path, stack)
    }

    /// Classify an error raised anywhere in the Actix pipeline.
    ///
    /// Handler failures are recovered by downcasting; framework errors keep
    /// a declared 4xx status and become 500s otherwise.
    #[must_use]
    pub fn classify_actix(&self, error: &actix_web::Error, url_path: &str) -> ErrorEnvelope {
        if let Some(failure) = error.as_error::<Failure>() {
            return self.classify(failure, url_path);
        }

        let declared = error.as_response_error().status_code();
        let status = if declared.is_client_error() {
            declared
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let stack = self.expose_debug.then(|| format!("{error}\n{error:?}"));
        self.envelope(Classification::new(status, error.to_string()), url_path, stack)
    }

    /// Classify an error response produced without an error value, such as
    /// an unmatched route or method.
    #[must_use]
    pub fn classify_status(&self, status: StatusCode, url_path: &str) -> ErrorEnvelope {
        let message = status.canonical_reason().unwrap_or(FALLBACK_MESSAGE);
        let stack = self.expose_debug.then(|| status.to_string());
        self.envelope(Classification::new(status, message), url_path, stack)
    }

    fn envelope(
        &self,
        classification: Classification,
        url_path: &str,
        stack: Option<String>,
    ) -> ErrorEnvelope {
        let Classification {
            status,
            message,
            details,
        } = classification;
        let message = if message.trim().is_empty() {
            FALLBACK_MESSAGE.to_owned()
        } else {
            message
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), path = url_path, %message, "Request failed");
        } else {
            warn!(status = status.as_u16(), path = url_path, %message, "Request rejected");
        }

        ErrorEnvelope {
            status_code: status.as_u16(),
            error: ErrorBody {
                code: status.as_u16(),
                url_path: url_path.to_owned(),
                timestamp: self
                    .clock
                    .utc()
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
                message,
                details: (!details.is_empty()).then_some(details),
                debug: stack.map(|stack| DebugInfo { stack }),
            },
        }
    }
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("expose_debug", &self.expose_debug)
            .finish_non_exhaustive()
    }
}
