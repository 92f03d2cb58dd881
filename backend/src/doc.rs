//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] holds the routes mounted at fixed paths together with every
//! shared schema. The scaffold endpoints live under the configurable API
//! prefix, so [`openapi`] nests them under it when the document is built.

use utoipa::OpenApi;

use crate::domain::ports::TransportKind;
use crate::domain::{FieldViolation, PublishOutcome};
use crate::inbound::http::classifier::{DebugInfo, ErrorBody, ErrorEnvelope};
use crate::inbound::http::demo::{ItemPage, MessageQueueCheck};
use crate::inbound::http::envelope::SuccessEnvelope;
use pagination::PaginationMeta;

/// OpenAPI document for routes outside the API prefix.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Microservice API",
        description = "Scaffold endpoints wrapped in the canonical success and error envelopes."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        SuccessEnvelope,
        ErrorEnvelope,
        ErrorBody,
        DebugInfo,
        FieldViolation,
        PaginationMeta,
        MessageQueueCheck,
        ItemPage,
        PublishOutcome,
        TransportKind,
    )),
    tags(
        (name = "test", description = "Scaffold endpoints exercising the boundary layer"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

/// Routes mounted under the API prefix.
#[derive(OpenApi)]
#[openapi(paths(
    crate::inbound::http::demo::hello,
    crate::inbound::http::demo::test_microservice_communication,
    crate::inbound::http::demo::test_message_queue,
    crate::inbound::http::demo::test_pagination,
))]
struct PrefixedApi;

/// Build the full document with prefixed routes nested under `api_prefix`.
#[must_use]
pub fn openapi(api_prefix: &str) -> utoipa::openapi::OpenApi {
    ApiDoc::openapi().nest(api_prefix, PrefixedApi::openapi())
}
