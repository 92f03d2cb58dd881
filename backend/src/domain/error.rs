//! Errors raised deliberately by request handlers.
//!
//! These errors are transport agnostic. The inbound HTTP adapter maps each
//! [`ErrorCode`] onto a status and renders the error inside the shared error
//! envelope.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed.
    InvalidRequest,
    /// Authentication failed or is missing.
    Unauthorized,
    /// Authenticated but not permitted to perform this action.
    Forbidden,
    /// The requested resource does not exist.
    NotFound,
    /// The request conflicts with the current state of a resource.
    Conflict,
    /// The request is well formed but one or more fields failed validation.
    ValidationFailed,
    /// The caller has sent too many requests.
    TooManyRequests,
    /// A dependency needed to serve the request is unavailable.
    ServiceUnavailable,
    /// An unexpected error occurred inside the service.
    InternalError,
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldViolation {
    /// Name of the offending field, e.g. `pageSize` or `body`.
    #[schema(example = "pageSize")]
    pub field: String,
    /// Why the value was rejected.
    #[schema(example = "must be greater than zero")]
    pub message: String,
}

impl FieldViolation {
    /// Describe why `field` was rejected.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// An error a handler raises on purpose, with a declared category.
///
/// The message is passed through to the client verbatim; a blank message is
/// replaced by a generic fallback when the error is rendered.
///
/// # Examples
/// ```
/// use microservice::domain::{AppError, ErrorCode, FieldViolation};
///
/// let err = AppError::validation(
///     "Validation failed",
///     vec![FieldViolation::new("pageSize", "must be greater than zero")],
/// );
/// assert_eq!(err.code(), ErrorCode::ValidationFailed);
/// assert_eq!(err.details().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    code: ErrorCode,
    message: String,
    details: Vec<FieldViolation>,
}

impl AppError {
    /// Create an error of the given category.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message returned to clients.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Field-level validation failures, empty unless the error carries any.
    #[must_use]
    pub fn details(&self) -> &[FieldViolation] {
        &self.details
    }

    /// Attach field-level validation failures.
    #[must_use]
    pub fn with_details(mut self, details: Vec<FieldViolation>) -> Self {
        self.details = details;
        self
    }

    /// Append a single field-level validation failure.
    #[must_use]
    pub fn with_violation(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.details.push(FieldViolation::new(field, message));
        self
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::Unauthorized`].
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Convenience constructor for [`ErrorCode::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Validation failure carrying one entry per rejected field.
    pub fn validation(message: impl Into<String>, violations: Vec<FieldViolation>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message).with_details(violations)
    }

    /// Convenience constructor for [`ErrorCode::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}
