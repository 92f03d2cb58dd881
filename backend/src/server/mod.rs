//! Server construction and middleware wiring.

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::doc::openapi;
use crate::inbound::http::Classifier;
use crate::inbound::http::demo::{
    hello, test_message_queue, test_microservice_communication, test_pagination,
};
use crate::inbound::http::error::{json_error_handler, query_error_handler};
use crate::inbound::http::health::{HealthState, live, ready};
use crate::inbound::http::state::HttpState;
use crate::middleware::Normalize;
use crate::middleware::normalize::url_path;

/// Everything the application factory needs, cloned into each worker.
#[derive(Clone)]
pub struct AppDependencies {
    pub config: Arc<AppConfig>,
    pub health_state: web::Data<HealthState>,
    pub http_state: web::Data<HttpState>,
    pub classifier: Classifier,
}

impl AppDependencies {
    /// Bundle dependencies, deriving the classifier from the configured
    /// environment.
    pub fn new(
        config: Arc<AppConfig>,
        health_state: web::Data<HealthState>,
        http_state: HttpState,
    ) -> Self {
        let classifier = Classifier::for_environment(&config.app.environment);
        Self {
            config,
            health_state,
            http_state: web::Data::new(http_state),
            classifier,
        }
    }

    /// Replace the classifier, e.g. to pin the clock in tests.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }
}

/// Whether Swagger UI and the OpenAPI document are served.
fn docs_enabled(config: &AppConfig) -> bool {
    cfg!(debug_assertions) || config.app.debug
}

async fn route_not_found(req: HttpRequest, classifier: web::Data<Classifier>) -> HttpResponse {
    classifier
        .classify_status(StatusCode::NOT_FOUND, &url_path(&req))
        .into_response()
}

/// Build the Actix application.
///
/// Routes under the API prefix are wrapped by [`Normalize`]; health checks
/// and the documentation UI are not. The UI owns only `/swagger-ui/`, so any
/// other path, including unknown `/api/*` paths, answers with a 404 error
/// envelope.
pub fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        config,
        health_state,
        http_state,
        classifier,
    } = deps;

    let api = web::scope(&config.app.api_prefix)
        .wrap(Normalize::new(classifier.clone()))
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .service(hello)
        .service(test_microservice_communication)
        .service(test_message_queue)
        .service(test_pagination);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(web::Data::new(classifier))
        .service(api)
        .service(ready)
        .service(live);

    let app = if docs_enabled(&config) {
        app.service(
            SwaggerUi::new("/swagger-ui/{_:.*}")
                .url("/api-docs/openapi.json", openapi(&config.app.api_prefix)),
        )
    } else {
        app
    };

    app.default_service(web::to(route_not_found))
}

/// Construct the HTTP server bound to `bind_addr`.
///
/// # Returns
/// A [`Server`] that must be awaited to drive the listener. It stops
/// gracefully on `SIGINT` or `SIGTERM`.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(deps: AppDependencies, bind_addr: SocketAddr) -> std::io::Result<Server> {
    let server = HttpServer::new(move || build_app(deps.clone()))
        .bind(bind_addr)?
        .run();
    Ok(server)
}
