//! Shared helpers for integration tests.

use std::collections::HashMap;

use microservice::config::AppConfig;
use mockable::MockEnv;

/// Environment holding every required key, pointed at the given upstream.
pub fn complete_env(environment: &str, health_base_url: &str) -> HashMap<String, String> {
    [
        ("APP_ENV", environment),
        ("APP_API_PREFIX", "/api/user"),
        ("APP_DEBUG", "true"),
        ("JWT_SECRET", "jwt-signing-secret"),
        ("JWT_EXPIRES_IN", "1h"),
        ("DB_HOST", "db.internal"),
        ("DB_PORT", "5432"),
        ("DB_USER", "svc"),
        ("DB_PASSWORD", "db-password"),
        ("DB_NAME", "users"),
        ("BROKER_HOST", "127.0.0.1"),
        ("BROKER_PORT", "4222"),
        ("BROKER_USERNAME", "publisher"),
        ("BROKER_PASSWORD", "broker-password"),
        ("BROKER_QUEUE", "users"),
        ("BROKER_CONNECT_TIMEOUT_SECS", "1"),
        ("BROKER_DRAIN_TIMEOUT_SECS", "1"),
        ("HTTP_CLIENT_TIMEOUT_SECS", "2"),
        ("HEALTH_SERVICE_BASE_URL", health_base_url),
        ("HEALTH_SERVICE_API_PREFIX", "/api/health"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_owned(), value.to_owned()))
    .collect()
}

/// Validated configuration built from [`complete_env`].
pub fn app_config(environment: &str, health_base_url: &str) -> AppConfig {
    let vars = complete_env(environment, health_base_url);
    let mut env = MockEnv::new();
    env.expect_string()
        .times(0..)
        .returning(move |key| vars.get(key).cloned());
    AppConfig::from_env(&env).expect("test environment is complete")
}
