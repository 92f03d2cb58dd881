//! Process configuration loaded once from the environment.
//!
//! [`AppConfig::from_env`] reads every declared variable through a
//! [`mockable::Env`], coerces numbers and booleans, applies defaults to
//! optional keys and collects *all* violations before failing. The resulting value is
//! immutable and shared behind an `Arc` for the lifetime of the process; no
//! component reads the raw environment after startup.

mod reader;
mod secret;

use std::time::Duration;

use mockable::{DefaultEnv, Env};
use tracing::error;

use reader::FieldReader;
pub use secret::Secret;

/// Environment name selecting the live broker transport.
pub const BROKER_ENVIRONMENT: &str = "local";
/// Environment name that exposes debug detail in error envelopes.
pub const DEVELOPMENT_ENVIRONMENT: &str = "development";

pub(crate) const APP_ENV: &str = "APP_ENV";
/// Consulted when `APP_ENV` is unset.
pub(crate) const NODE_ENV: &str = "NODE_ENV";
pub(crate) const PORT: &str = "PORT";
pub(crate) const APP_NAME: &str = "APP_NAME";
pub(crate) const APP_API_PREFIX: &str = "APP_API_PREFIX";
pub(crate) const APP_DEBUG: &str = "APP_DEBUG";
pub(crate) const JWT_SECRET: &str = "JWT_SECRET";
pub(crate) const JWT_EXPIRES_IN: &str = "JWT_EXPIRES_IN";
pub(crate) const DB_HOST: &str = "DB_HOST";
pub(crate) const DB_PORT: &str = "DB_PORT";
pub(crate) const DB_USER: &str = "DB_USER";
pub(crate) const DB_PASSWORD: &str = "DB_PASSWORD";
pub(crate) const DB_NAME: &str = "DB_NAME";
pub(crate) const BROKER_HOST: &str = "BROKER_HOST";
pub(crate) const BROKER_PORT: &str = "BROKER_PORT";
pub(crate) const BROKER_USERNAME: &str = "BROKER_USERNAME";
pub(crate) const BROKER_PASSWORD: &str = "BROKER_PASSWORD";
pub(crate) const BROKER_QUEUE: &str = "BROKER_QUEUE";
pub(crate) const BROKER_CONNECT_TIMEOUT_SECS: &str = "BROKER_CONNECT_TIMEOUT_SECS";
pub(crate) const BROKER_DRAIN_TIMEOUT_SECS: &str = "BROKER_DRAIN_TIMEOUT_SECS";
pub(crate) const BROKER_PUBLISH_TIMEOUT_SECS: &str = "BROKER_PUBLISH_TIMEOUT_SECS";
pub(crate) const HTTP_CLIENT_TIMEOUT_SECS: &str = "HTTP_CLIENT_TIMEOUT_SECS";
pub(crate) const HEALTH_SERVICE_BASE_URL: &str = "HEALTH_SERVICE_BASE_URL";
pub(crate) const HEALTH_SERVICE_API_PREFIX: &str = "HEALTH_SERVICE_API_PREFIX";

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_APP_NAME: &str = "ms-v1";
const DEFAULT_API_PREFIX: &str = "/api/user";
const DEFAULT_BROKER_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_BROKER_DRAIN_TIMEOUT_SECS: u64 = 5;
const DEFAULT_BROKER_PUBLISH_TIMEOUT_SECS: u64 = 5;
const DEFAULT_HTTP_CLIENT_TIMEOUT_SECS: u64 = 10;

/// A single invalid or missing configuration field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// A required variable is absent or blank.
    #[error("{name} is required")]
    Missing { name: &'static str },
    /// A numeric variable could not be parsed.
    #[error("{name} must be a number ({expected}), got '{value}'")]
    NotANumber {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    /// A boolean variable used an unrecognised token.
    #[error("{name} must be a boolean ({expected}), got '{value}'")]
    NotABoolean {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl FieldError {
    /// Name of the offending environment variable.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Missing { name }
            | Self::NotANumber { name, .. }
            | Self::NotABoolean { name, .. } => name,
        }
    }
}

/// Aggregated configuration failure listing every violation at once.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("environment validation failed: {}", join_violations(.violations))]
pub struct ConfigError {
    violations: Vec<FieldError>,
}

impl ConfigError {
    /// Every violation found, in declaration order.
    #[must_use]
    pub fn violations(&self) -> &[FieldError] {
        &self.violations
    }
}

fn join_violations(violations: &[FieldError]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Deployment environment name, e.g. `development`, `local` or `production`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment(String);

impl Environment {
    /// Wrap a raw environment name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Raw environment name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Whether error envelopes may carry debug detail.
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.0 == DEVELOPMENT_ENVIRONMENT
    }

    /// Whether the messaging gateway may open a broker connection.
    #[must_use]
    pub fn enables_broker(&self) -> bool {
        self.0 == BROKER_ENVIRONMENT
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Application identity and HTTP surface settings.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub environment: Environment,
    pub port: u16,
    pub name: String,
    pub api_prefix: String,
    /// Serve the API documentation even in release builds.
    pub debug: bool,
}

/// Token signing settings.
#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: Secret,
    pub expires_in: String,
}

/// Database connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Secret,
    pub database: String,
}

/// Message broker connection settings.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Secret,
    /// Subject prefix every published topic is routed under.
    pub queue: String,
    pub connect_timeout: Duration,
    /// Upper bound on one publish round-trip.
    pub publish_timeout: Duration,
    /// Upper bound on flushing pending messages at shutdown.
    pub drain_timeout: Duration,
}

impl BrokerSettings {
    /// Connection URL for the broker.
    #[must_use]
    pub fn url(&self) -> String {
        format!("nats://{}:{}", self.host, self.port)
    }
}

/// Outbound HTTP client settings.
#[derive(Debug, Clone)]
pub struct HttpClientSettings {
    pub timeout: Duration,
}

/// Base URL and path prefix of a downstream service.
#[derive(Debug, Clone)]
pub struct ServiceEndpoint {
    pub base_url: String,
    pub api_prefix: String,
}

impl ServiceEndpoint {
    /// Join the endpoint with a path relative to its API prefix.
    ///
    /// ```
    /// use microservice::config::ServiceEndpoint;
    ///
    /// let endpoint = ServiceEndpoint {
    ///     base_url: "http://health:3000/".into(),
    ///     api_prefix: "/api/health".into(),
    /// };
    /// assert_eq!(endpoint.url("/test"), "http://health:3000/api/health/test");
    /// ```
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let prefix = self.api_prefix.trim_matches('/');
        let path = path.trim_start_matches('/');
        if prefix.is_empty() {
            format!("{base}/{path}")
        } else {
            format!("{base}/{prefix}/{path}")
        }
    }
}

/// Downstream services reachable through the outbound HTTP client.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub health: ServiceEndpoint,
}

/// Validated, immutable process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub jwt: JwtSettings,
    pub database: DatabaseSettings,
    pub broker: BrokerSettings,
    pub http_client: HttpClientSettings,
    pub upstreams: UpstreamSettings,
}

impl AppConfig {
    /// Validate configuration from the supplied environment source.
    ///
    /// # Examples
    ///
    /// ```
    /// use microservice::config::AppConfig;
    /// use mockable::MockEnv;
    ///
    /// let mut env = MockEnv::new();
    /// env.expect_string().returning(|_| None);
    /// let err = AppConfig::from_env(&env).expect_err("required keys are missing");
    /// assert!(err.to_string().contains("JWT_SECRET is required"));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] listing every missing required key and every
    /// value that failed coercion. The error is logged before returning.
    pub fn from_env<E: Env>(env: &E) -> Result<Self, ConfigError> {
        let mut fields = FieldReader::new(env);

        let app = AppSettings {
            environment: Environment::new(
                fields
                    .first_present(&[APP_ENV, NODE_ENV])
                    .unwrap_or_else(|| DEVELOPMENT_ENVIRONMENT.to_owned()),
            ),
            port: fields.optional_number(PORT, DEFAULT_PORT),
            name: fields.optional_string(APP_NAME, DEFAULT_APP_NAME),
            api_prefix: fields.optional_string(APP_API_PREFIX, DEFAULT_API_PREFIX),
            debug: fields.optional_bool(APP_DEBUG, false),
        };
        let jwt = JwtSettings {
            secret: fields.required_secret(JWT_SECRET),
            expires_in: fields.required_string(JWT_EXPIRES_IN),
        };
        let database = DatabaseSettings {
            host: fields.required_string(DB_HOST),
            port: fields.required_number(DB_PORT),
            username: fields.required_string(DB_USER),
            password: fields.required_secret(DB_PASSWORD),
            database: fields.required_string(DB_NAME),
        };
        let broker = BrokerSettings {
            host: fields.required_string(BROKER_HOST),
            port: fields.required_number(BROKER_PORT),
            username: fields.required_string(BROKER_USERNAME),
            password: fields.required_secret(BROKER_PASSWORD),
            queue: fields.required_string(BROKER_QUEUE),
            connect_timeout: Duration::from_secs(fields.optional_number(
                BROKER_CONNECT_TIMEOUT_SECS,
                DEFAULT_BROKER_CONNECT_TIMEOUT_SECS,
            )),
            publish_timeout: Duration::from_secs(fields.optional_number(
                BROKER_PUBLISH_TIMEOUT_SECS,
                DEFAULT_BROKER_PUBLISH_TIMEOUT_SECS,
            )),
            drain_timeout: Duration::from_secs(fields.optional_number(
                BROKER_DRAIN_TIMEOUT_SECS,
                DEFAULT_BROKER_DRAIN_TIMEOUT_SECS,
            )),
        };
        let http_client = HttpClientSettings {
            timeout: Duration::from_secs(
                fields.optional_number(HTTP_CLIENT_TIMEOUT_SECS, DEFAULT_HTTP_CLIENT_TIMEOUT_SECS),
            ),
        };
        let upstreams = UpstreamSettings {
            health: ServiceEndpoint {
                base_url: fields.required_string(HEALTH_SERVICE_BASE_URL),
                api_prefix: fields.required_string(HEALTH_SERVICE_API_PREFIX),
            },
        };

        let config = Self {
            app,
            jwt,
            database,
            broker,
            http_client,
            upstreams,
        };
        fields.finish(config).inspect_err(|err| {
            error!(
                violations = err.violations().len(),
                "Environment validation errors: {err}"
            );
        })
    }

    /// Validate configuration from the live process environment.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_process_env() -> Result<Self, ConfigError> {
        Self::from_env(&DefaultEnv::new())
    }
}
