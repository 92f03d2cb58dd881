//! Response normalisation at the outermost edge of the API.
//!
//! [`Normalize`] runs once per request. It opens a request span carrying a
//! fresh `request_id`, then rewrites the response:
//!
//! - success bodies are wrapped in a [`SuccessEnvelope`];
//! - responses carrying an error, errors returned by inner services and
//!   bare 4xx/5xx responses are rendered through the [`Classifier`];
//! - `204 No Content`, informational and redirect responses pass through.

use std::task::{Context, Poll};

use actix_web::body::{BoxBody, MessageBody, to_bytes};
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use actix_web::{Error, HttpRequest, HttpResponse};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use serde_json::Value;
use tracing::{Instrument, error, info_span};
use uuid::Uuid;

use crate::domain::Failure;
use crate::inbound::http::{Classifier, SuccessEnvelope};

/// Header echoing the request identifier on every normalised response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware wrapping every response in the canonical envelopes.
///
/// # Examples
/// ```
/// use actix_web::{App, web};
/// use microservice::config::Environment;
/// use microservice::inbound::http::Classifier;
/// use microservice::middleware::Normalize;
///
/// let classifier = Classifier::for_environment(&Environment::new("production"));
/// let _app = App::new().service(web::scope("/api").wrap(Normalize::new(classifier)));
/// ```
#[derive(Debug, Clone)]
pub struct Normalize {
    classifier: Classifier,
}

impl Normalize {
    /// Normalise responses using `classifier` for failures.
    pub fn new(classifier: Classifier) -> Self {
        Self { classifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Normalize
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = NormalizeMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(NormalizeMiddleware {
            service,
            classifier: self.classifier.clone(),
        }))
    }
}

/// Service wrapper produced by [`Normalize`].
pub struct NormalizeMiddleware<S> {
    service: S,
    classifier: Classifier,
}

impl<S, B> Service<ServiceRequest> for NormalizeMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "request",
            %request_id,
            method = %req.method(),
            path = %req.path(),
        );
        // Routing needs sole ownership of the request, so only the path is
        // captured here.
        let url_path = url_path(req.request());
        let classifier = self.classifier.clone();
        let fut = span.in_scope(|| self.service.call(req));

        Box::pin(
            async move {
                match fut.await {
                    Ok(res) => {
                        let mut res = normalize(res, &classifier, &url_path).await;
                        stamp_request_id(res.headers_mut(), request_id);
                        Ok(res)
                    }
                    Err(err) => {
                        let mut response =
                            classifier.classify_actix(&err, &url_path).into_response();
                        stamp_request_id(response.headers_mut(), request_id);
                        Err(InternalError::from_response(err, response).into())
                    }
                }
            }
            .instrument(span),
        )
    }
}

fn stamp_request_id(headers: &mut HeaderMap, request_id: Uuid) {
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
}

/// Path and query of the request, as reported in error envelopes.
pub(crate) fn url_path(req: &HttpRequest) -> String {
    req.uri()
        .path_and_query()
        .map_or_else(|| req.path().to_owned(), |pq| pq.as_str().to_owned())
}

async fn normalize<B>(
    res: ServiceResponse<B>,
    classifier: &Classifier,
    url_path: &str,
) -> ServiceResponse<BoxBody>
where
    B: MessageBody + 'static,
{
    if let Some(err) = res.response().error() {
        let envelope = classifier.classify_actix(err, url_path);
        let (req, _) = res.into_parts();
        return ServiceResponse::new(req, envelope.into_response());
    }

    let status = res.status();
    if status.is_client_error() || status.is_server_error() {
        let envelope = classifier.classify_status(status, url_path);
        let (req, _) = res.into_parts();
        return ServiceResponse::new(req, envelope.into_response());
    }
    if !status.is_success() || status == StatusCode::NO_CONTENT {
        return res.map_into_boxed_body();
    }

    let (req, response) = res.into_parts();
    let (head, body) = response.into_parts();
    let bytes = match to_bytes(body).await {
        Ok(bytes) => bytes,
        Err(err) => {
            let err: Box<dyn std::error::Error> = err.into();
            error!(error = %err, "Failed to read response body");
            let envelope = classifier.classify(&Failure::internal(err.to_string()), url_path);
            return ServiceResponse::new(req, envelope.into_response());
        }
    };

    let is_json = head
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(is_json_content_type);
    let envelope = SuccessEnvelope::wrap(status.as_u16(), body_value(&bytes, is_json));

    let mut builder = HttpResponse::build(status);
    for (name, value) in head.headers() {
        if *name != header::CONTENT_TYPE && *name != header::CONTENT_LENGTH {
            builder.append_header((name.clone(), value.clone()));
        }
    }
    ServiceResponse::new(req, builder.json(envelope))
}

fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

/// Decode a handler body: JSON when declared and parseable, text otherwise,
/// `null` when empty.
fn body_value(bytes: &[u8], is_json: bool) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    let parsed = if is_json {
        serde_json::from_slice(bytes).ok()
    } else {
        None
    };
    parsed.unwrap_or_else(|| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use actix_web::error::ErrorServiceUnavailable;
    use actix_web::{App, test as actix_test, web};
    use rstest::rstest;
    use serde_json::json;

    fn classifier() -> Classifier {
        Classifier::for_environment(&Environment::new("production"))
    }

    #[actix_web::test]
    async fn routed_responses_are_wrapped() {
        let app = actix_test::init_service(
            App::new().service(
                web::scope("/api")
                    .wrap(Normalize::new(classifier()))
                    .route("/items/{id}", web::get().to(|| async { "pong" })),
            ),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/api/items/7").to_request();
        let res = actix_test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key(REQUEST_ID_HEADER));
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body, json!({ "statusCode": 200, "data": "pong" }));
    }

    #[actix_web::test]
    async fn inner_service_errors_carry_an_error_envelope() {
        let app = actix_test::init_service(
            App::new().service(
                web::scope("/api")
                    .wrap_fn(|_req, _srv| async {
                        Err::<ServiceResponse, Error>(ErrorServiceUnavailable("broker down"))
                    })
                    .wrap(Normalize::new(classifier()))
                    .route("/ping", web::get().to(HttpResponse::Ok)),
            ),
        )
        .await;

        let result = app
            .call(actix_test::TestRequest::get().uri("/api/ping?x=1").to_request())
            .await;

        let Err(err) = result else {
            panic!("inner error should propagate");
        };
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        let bytes = to_bytes(response.into_body()).await.expect("readable body");
        let body: Value = serde_json::from_slice(&bytes).expect("JSON envelope");
        assert_eq!(body["error"]["message"], "broker down");
        assert_eq!(body["error"]["urlPath"], "/api/ping?x=1");
    }

    #[rstest]
    #[case("application/json", true)]
    #[case("application/json; charset=utf-8", true)]
    #[case("application/problem+json", true)]
    #[case("Application/JSON", true)]
    #[case("text/plain; charset=utf-8", false)]
    #[case("text/html", false)]
    fn json_content_types_are_recognised(#[case] content_type: &str, #[case] expected: bool) {
        assert_eq!(is_json_content_type(content_type), expected);
    }

    #[rstest]
    #[case(b"".as_slice(), true, Value::Null)]
    #[case(br#"{"a":1}"#.as_slice(), true, json!({"a": 1}))]
    #[case(br#"{"a":1}"#.as_slice(), false, json!(r#"{"a":1}"#))]
    #[case(b"Hello World!".as_slice(), false, json!("Hello World!"))]
    #[case(b"not json".as_slice(), true, json!("not json"))]
    fn bodies_decode_by_content_type(
        #[case] bytes: &[u8],
        #[case] is_json: bool,
        #[case] expected: Value,
    ) {
        assert_eq!(body_value(bytes, is_json), expected);
    }
}
