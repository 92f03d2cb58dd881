//! HTTP mapping for handler failures and request extraction errors.
//!
//! Keep the domain free of transport concerns by attaching Actix behaviour
//! to [`Failure`] here. The response produced by [`ResponseError`] is a
//! placeholder carrying only the status: the normalising middleware finds
//! the failure on the response and renders the full envelope, which needs
//! the request path.

use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};

use super::classifier::classify_failure;
use crate::domain::{AppError, Failure};

impl ResponseError for Failure {
    fn status_code(&self) -> StatusCode {
        classify_failure(self).status
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::new(self.status_code())
    }
}

/// Turn unreadable JSON bodies into invalid requests on the `body` field.
///
/// This covers malformed JSON and a missing or wrong content type, which
/// all declare 400. Payload errors declaring another status, such as an
/// oversized body, keep it.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    if err.status_code() != StatusCode::BAD_REQUEST {
        return err.into();
    }
    let error =
        AppError::invalid_request("Invalid JSON body").with_violation("body", err.to_string());
    Failure::from(error).into()
}

/// Turn undecodable query strings into validation failures on the `query`
/// field.
pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    Failure::from(
        AppError::invalid_request("Invalid query string").with_violation("query", err.to_string()),
    )
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::UpstreamError;
    use actix_web::test::TestRequest;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(Failure::from(AppError::not_found("gone")), StatusCode::NOT_FOUND)]
    #[case(Failure::from(UpstreamError::unreachable("timeout")), StatusCode::GATEWAY_TIMEOUT)]
    #[case(Failure::from(UpstreamError::rejected(418, json!(null))), StatusCode::IM_A_TEAPOT)]
    #[case(Failure::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
    fn failures_report_their_classified_status(
        #[case] failure: Failure,
        #[case] expected: StatusCode,
    ) {
        assert_eq!(failure.status_code(), expected);
        assert_eq!(failure.error_response().status(), expected);
    }

    #[rstest]
    fn malformed_json_becomes_an_invalid_request() {
        let req = TestRequest::default().to_http_request();
        let source = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid JSON");

        let error = json_error_handler(JsonPayloadError::Deserialize(source), &req);

        let failure = error.as_error::<Failure>().expect("failure attached");
        match failure {
            Failure::Application(app) => {
                assert_eq!(app.message(), "Invalid JSON body");
                assert_eq!(app.details()[0].field, "body");
            }
            other => panic!("expected application failure, got {other:?}"),
        }
    }

    #[rstest]
    fn wrong_content_types_are_invalid_requests() {
        let req = TestRequest::default().to_http_request();

        let error = json_error_handler(JsonPayloadError::ContentType, &req);

        let failure = error.as_error::<Failure>().expect("failure attached");
        assert_eq!(failure.status_code(), StatusCode::BAD_REQUEST);
    }

    #[rstest]
    fn oversized_bodies_keep_their_status() {
        let req = TestRequest::default().to_http_request();

        let error = json_error_handler(JsonPayloadError::Overflow { limit: 16 }, &req);

        assert!(error.as_error::<Failure>().is_none());
        assert_eq!(error.as_response_error().status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
