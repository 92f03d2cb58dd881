//! Microservice scaffold with a normalised HTTP boundary.
//!
//! Configuration is validated once at startup ([`config`]); handlers return
//! [`domain::ApiResult`]; the [`middleware::Normalize`] layer wraps every
//! response in the canonical envelopes; outbound calls go through
//! [`outbound::upstream::UpstreamClient`] and messages through the
//! [`domain::MessagingGateway`].

pub mod config;
pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;

#[cfg(test)]
mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
