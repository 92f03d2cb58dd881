//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data`; it is built once
//! at startup from the validated configuration.

use crate::config::ServiceEndpoint;
use crate::domain::MessagingGateway;
use crate::outbound::upstream::UpstreamClient;

/// Dependency bundle for HTTP handlers.
#[derive(Debug, Clone)]
pub struct HttpState {
    /// Fire-and-forget publisher.
    pub messaging: MessagingGateway,
    /// Client for calls to sibling services.
    pub upstream: UpstreamClient,
    /// Location of the health service used by the connectivity check.
    pub health_service: ServiceEndpoint,
}

impl HttpState {
    /// Bundle handler dependencies.
    pub fn new(
        messaging: MessagingGateway,
        upstream: UpstreamClient,
        health_service: ServiceEndpoint,
    ) -> Self {
        Self {
            messaging,
            upstream,
            health_service,
        }
    }
}
