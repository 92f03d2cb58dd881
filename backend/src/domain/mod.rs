//! Transport-agnostic core of the service.
//!
//! Purpose: describe failures, upstream calls and message publication in
//! terms the inbound and outbound adapters can both map onto. Nothing here
//! knows about Actix, reqwest or the broker client.
//!
//! Public surface:
//! - AppError / ErrorCode / FieldViolation: failures raised deliberately by
//!   handlers.
//! - Failure: everything a handler can return, including upstream and
//!   internal faults.
//! - MessagingGateway / PublishOutcome: fire-and-forget publication over a
//!   [`ports::MessagingClient`].

pub mod error;
pub mod failure;
pub mod messaging;
pub mod ports;

pub use self::error::{AppError, ErrorCode, FieldViolation};
pub use self::failure::{Failure, InternalFailure};
pub use self::messaging::{MessagingGateway, PublishOutcome};

/// Convenient handler result alias.
///
/// # Examples
/// ```
/// use microservice::domain::{ApiResult, AppError};
///
/// fn handler() -> ApiResult<&'static str> {
///     Err(AppError::forbidden("nope").into())
/// }
/// assert!(handler().is_err());
/// ```
pub type ApiResult<T> = Result<T, Failure>;
