//! Everything a request handler may fail with.

use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

use super::error::AppError;
use super::ports::UpstreamError;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Failure raised while serving a request.
///
/// The response boundary classifies each variant into a status, a
/// client-facing message and optional details:
///
/// - [`Failure::Application`]: raised on purpose with a declared category.
/// - [`Failure::Upstream`]: a call to another service failed.
/// - [`Failure::Internal`]: anything else; the client only sees a generic
///   message.
///
/// # Examples
/// ```
/// use microservice::domain::{AppError, Failure};
///
/// let failure: Failure = AppError::not_found("User not found").into();
/// assert!(matches!(failure, Failure::Application(_)));
///
/// let failure = Failure::internal("database pool exhausted");
/// assert_eq!(failure.to_string(), "database pool exhausted");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    /// A deliberately raised application error.
    #[error(transparent)]
    Application(#[from] AppError),
    /// An outbound HTTP call failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    /// An unexpected fault.
    #[error(transparent)]
    Internal(#[from] InternalFailure),
}

impl Failure {
    /// Wrap an unexpected error, capturing a backtrace at the call site.
    pub fn internal<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Internal(InternalFailure::new(error))
    }
}

/// An unexpected error together with the backtrace captured when it was
/// wrapped.
///
/// The backtrace is only populated when `RUST_BACKTRACE` or
/// `RUST_LIB_BACKTRACE` enables capture.
#[derive(Debug)]
pub struct InternalFailure {
    error: BoxError,
    backtrace: Backtrace,
}

impl InternalFailure {
    /// Wrap `error` and capture the current backtrace.
    pub fn new<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self {
            error: error.into(),
            backtrace: Backtrace::capture(),
        }
    }

    /// Backtrace captured when the failure was wrapped.
    #[must_use]
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for InternalFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl StdError for InternalFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.error.source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Debug, thiserror::Error)]
    #[error("query failed")]
    struct QueryFailed(#[source] std::io::Error);

    #[rstest]
    fn internal_failures_expose_their_cause_chain() {
        let failure = InternalFailure::new(QueryFailed(std::io::Error::other("socket closed")));

        assert_eq!(failure.to_string(), "query failed");
        let cause = failure.source().map(ToString::to_string);
        assert_eq!(cause.as_deref(), Some("socket closed"));
    }

    #[rstest]
    fn string_messages_become_internal_failures() {
        let failure = Failure::internal("unexpected state");

        match failure {
            Failure::Internal(inner) => {
                assert_eq!(inner.to_string(), "unexpected state");
                assert!(inner.source().is_none());
            }
            other => panic!("expected internal failure, got {other:?}"),
        }
    }

    #[rstest]
    fn upstream_errors_convert_into_failures() {
        let failure: Failure = UpstreamError::unreachable("connection refused").into();
        assert!(matches!(failure, Failure::Upstream(UpstreamError::Unreachable { .. })));
    }
}
