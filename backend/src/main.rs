//! Service entry-point: validates configuration, wires adapters and serves
//! HTTP until a shutdown signal arrives.

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::web;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use microservice::config::AppConfig;
use microservice::domain::MessagingGateway;
use microservice::inbound::http::demo::HELLO_TOPIC;
use microservice::inbound::http::health::HealthState;
use microservice::inbound::http::state::HttpState;
use microservice::outbound::messaging::messaging_client_for;
use microservice::outbound::upstream::UpstreamClient;
use microservice::server::{AppDependencies, create_server};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(e) = fmt().with_env_filter(filter).json().try_init() {
        warn!(error = %e, "tracing init failed");
    }
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Loaded before tracing so `RUST_LOG` may come from the file too.
    let dotenv = dotenv::dotenv();
    init_tracing();
    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded environment file"),
        Err(err) if err.not_found() => {}
        Err(err) => warn!(error = %err, "Ignoring unreadable environment file"),
    }

    // Validation errors are logged by the validator; returning them exits non-zero.
    let config = Arc::new(AppConfig::from_process_env().map_err(std::io::Error::other)?);

    let gateway = MessagingGateway::new(messaging_client_for(&config));
    gateway.connect().await;
    gateway.listen(HELLO_TOPIC).await;

    let upstream = UpstreamClient::new(&config.http_client).map_err(|e| {
        std::io::Error::other(format!("failed to build outbound HTTP client: {e}"))
    })?;
    let http_state = HttpState::new(
        gateway.clone(),
        upstream,
        config.upstreams.health.clone(),
    );

    let health_state = web::Data::new(HealthState::new());
    let deps = AppDependencies::new(config.clone(), health_state.clone(), http_state);
    let bind_addr = SocketAddr::from(([0, 0, 0, 0], config.app.port));
    let server = create_server(deps, bind_addr)?;

    health_state.mark_ready();
    info!(
        name = %config.app.name,
        environment = %config.app.environment,
        transport = ?gateway.transport(),
        %bind_addr,
        "Server listening"
    );

    let result = server.await;
    health_state.mark_unhealthy();
    gateway.close().await;
    info!("Shutdown complete");
    result
}
