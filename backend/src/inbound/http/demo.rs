//! Scaffold endpoints exercising the boundary layer end to end.
//!
//! ```text
//! GET {prefix}/test
//! GET {prefix}/test/test-microservice-communication
//! GET {prefix}/test/test-message-queue
//! GET {prefix}/test/test-pagination?page=2&pageSize=10
//! ```

use actix_web::{get, web};
use pagination::{PaginationError, PaginationMeta};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use super::classifier::ErrorEnvelope;
use super::envelope::SuccessEnvelope;
use super::state::HttpState;
use crate::domain::ports::{TransportKind, UpstreamRequest};
use crate::domain::{ApiResult, AppError, FieldViolation, PublishOutcome};

/// Body returned by the greeting endpoint.
pub const GREETING: &str = "Hello World!";
/// Topic the message queue check publishes on.
pub const HELLO_TOPIC: &str = "hello";

const FIXTURE_ITEM_COUNT: u64 = 45;
const DEFAULT_PAGE_SIZE: u64 = 10;

/// Greeting used to check the service is up.
#[utoipa::path(
    get,
    path = "/test",
    tags = ["test"],
    responses(
        (status = 200, description = "Greeting in the success envelope", body = SuccessEnvelope)
    )
)]
#[get("/test")]
pub async fn hello() -> web::Json<&'static str> {
    web::Json(GREETING)
}

/// Call the health service's greeting and return its response body.
#[utoipa::path(
    get,
    path = "/test/test-microservice-communication",
    tags = ["test"],
    responses(
        (status = 200, description = "Upstream response body", body = SuccessEnvelope),
        (status = 500, description = "Request could not be built", body = ErrorEnvelope),
        (status = 502, description = "Upstream body was invalid", body = ErrorEnvelope),
        (status = 504, description = "Upstream did not answer", body = ErrorEnvelope)
    )
)]
#[get("/test/test-microservice-communication")]
pub async fn test_microservice_communication(
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<Value>> {
    let request = UpstreamRequest::get(state.health_service.url("/test"));
    let body: Value = state.upstream.send(request).await?;
    Ok(web::Json(body))
}

/// Result of the message queue check.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageQueueCheck {
    /// Topic the greeting was published on.
    #[schema(example = "hello")]
    pub topic: String,
    /// Transport backing the gateway.
    pub transport: TransportKind,
    /// What happened to the message.
    pub outcome: PublishOutcome,
}

/// Greeting message published on the `hello` topic.
#[derive(Debug, Clone, Serialize)]
struct HelloMessage {
    message: &'static str,
}

/// Publish a greeting through the messaging gateway.
///
/// Always succeeds: broker problems are reported through `outcome`.
#[utoipa::path(
    get,
    path = "/test/test-message-queue",
    tags = ["test"],
    responses(
        (status = 200, description = "Publish outcome", body = SuccessEnvelope)
    )
)]
#[get("/test/test-message-queue")]
pub async fn test_message_queue(state: web::Data<HttpState>) -> web::Json<MessageQueueCheck> {
    let outcome = state
        .messaging
        .publish(HELLO_TOPIC, &HelloMessage { message: GREETING })
        .await;
    web::Json(MessageQueueCheck {
        topic: HELLO_TOPIC.to_owned(),
        transport: state.messaging.transport(),
        outcome,
    })
}

/// Page selection for the pagination check.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// One-based page number; defaults to 1.
    pub page: Option<u64>,
    /// Items per page; defaults to 10.
    pub page_size: Option<u64>,
}

/// A page of fixture items with its pagination metadata.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ItemPage {
    /// Items on the requested page.
    pub items: Vec<String>,
    /// Lifted into the envelope's `meta` field.
    pub meta: PaginationMeta,
}

/// Serve a page of fixture items so clients can see pagination metadata.
#[utoipa::path(
    get,
    path = "/test/test-pagination",
    tags = ["test"],
    params(PageQuery),
    responses(
        (status = 200, description = "Items with pagination metadata", body = SuccessEnvelope),
        (status = 400, description = "Query string could not be decoded", body = ErrorEnvelope),
        (status = 422, description = "Page or page size is zero", body = ErrorEnvelope)
    )
)]
#[get("/test/test-pagination")]
pub async fn test_pagination(query: web::Query<PageQuery>) -> ApiResult<web::Json<ItemPage>> {
    Ok(web::Json(item_page(query.into_inner())?))
}

fn item_page(query: PageQuery) -> Result<ItemPage, AppError> {
    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    let meta = PaginationMeta::for_page(page, page_size, FIXTURE_ITEM_COUNT)
        .map_err(pagination_violation)?;

    let take = usize::try_from(page_size).unwrap_or(usize::MAX);
    let items = (meta.offset()..FIXTURE_ITEM_COUNT)
        .take(take)
        .map(|index| format!("Item {}", index + 1))
        .collect();
    Ok(ItemPage { items, meta })
}

fn pagination_violation(err: PaginationError) -> AppError {
    let field = match err {
        PaginationError::ZeroPageSize => "pageSize",
        PaginationError::ZeroPage { .. } => "page",
    };
    AppError::validation(
        "Validation failed",
        vec![FieldViolation::new(field, err.to_string())],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(PaginationError::ZeroPageSize, "pageSize")]
    #[case(PaginationError::ZeroPage { page: 0 }, "page")]
    fn pagination_errors_name_the_offending_parameter(
        #[case] err: PaginationError,
        #[case] field: &str,
    ) {
        let app = pagination_violation(err);
        assert_eq!(app.details()[0].field, field);
    }

    #[rstest]
    fn last_page_is_partial() {
        let page = item_page(PageQuery {
            page: Some(5),
            page_size: Some(10),
        })
        .expect("valid page");

        assert_eq!(page.items.first().map(String::as_str), Some("Item 41"));
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.meta.total_pages, Some(5));
    }

    #[rstest]
    fn pages_past_the_end_are_empty() {
        let page = item_page(PageQuery {
            page: Some(9),
            page_size: None,
        })
        .expect("valid page");

        assert!(page.items.is_empty());
        assert_eq!(page.meta.page, Some(9));
    }

    #[rstest]
    fn zero_page_size_is_a_validation_failure() {
        let err = item_page(PageQuery {
            page: None,
            page_size: Some(0),
        })
        .expect_err("zero page size");

        assert_eq!(err.code(), crate::domain::ErrorCode::ValidationFailed);
    }
}
