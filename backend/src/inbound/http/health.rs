//! Liveness and readiness checks for orchestrators and load balancers.
//!
//! These checks sit outside the response envelope: they answer with a bare status
//! so infrastructure can read them without parsing JSON. Both derive from a
//! single lifecycle phase that only moves forward.

use std::sync::atomic::{AtomicU8, Ordering};

use actix_web::http::StatusCode;
use actix_web::http::header::{CacheControl, CacheDirective};
use actix_web::{HttpResponse, get, web};
use tracing::debug;

const STARTING: u8 = 0;
const SERVING: u8 = 1;
const DRAINING: u8 = 2;

/// Lifecycle phase shared by the health checks and the binary.
///
/// Starts out alive but not ready. Ready once startup finishes; neither
/// ready nor alive once shutdown begins.
#[derive(Debug)]
pub struct HealthState {
    phase: AtomicU8,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            phase: AtomicU8::new(STARTING),
        }
    }
}

impl HealthState {
    /// A state in the starting phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Startup finished; accept traffic. Ignored once draining.
    pub fn mark_ready(&self) {
        let advanced = self
            .phase
            .compare_exchange(STARTING, SERVING, Ordering::AcqRel, Ordering::Acquire);
        if advanced.is_err() {
            debug!("Readiness unchanged; service is no longer starting");
        }
    }

    /// Shutdown began; fail both checks from now on.
    pub fn mark_unhealthy(&self) {
        self.phase.store(DRAINING, Ordering::Release);
    }

    /// Whether the service accepts traffic.
    pub fn is_ready(&self) -> bool {
        self.phase.load(Ordering::Acquire) == SERVING
    }

    /// Whether the process should be considered alive.
    pub fn is_alive(&self) -> bool {
        self.phase.load(Ordering::Acquire) != DRAINING
    }
}

fn health_response(healthy: bool) -> HttpResponse {
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    HttpResponse::build(status)
        .insert_header(CacheControl(vec![CacheDirective::NoStore]))
        .finish()
}

/// Readiness check: 200 while serving, 503 while starting or draining.
#[utoipa::path(
    get,
    path = "/health/ready",
    tags = ["health"],
    responses(
        (status = 200, description = "Server is ready to handle traffic"),
        (status = 503, description = "Server is starting or shutting down")
    )
)]
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    health_response(state.is_ready())
}

/// Liveness check: 200 until shutdown begins.
#[utoipa::path(
    get,
    path = "/health/live",
    tags = ["health"],
    responses(
        (status = 200, description = "Server is alive"),
        (status = 503, description = "Server is shutting down")
    )
)]
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    health_response(state.is_alive())
}
