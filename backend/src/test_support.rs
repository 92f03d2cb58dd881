//! Shared fixtures for unit tests.

use std::collections::HashMap;

use mockable::MockEnv;

use crate::config::AppConfig;

/// Environment holding every required key with a plausible value.
pub(crate) fn complete_env(environment: &str) -> HashMap<String, String> {
    [
        ("APP_ENV", environment),
        ("JWT_SECRET", "jwt-signing-secret"),
        ("JWT_EXPIRES_IN", "1h"),
        ("DB_HOST", "db.internal"),
        ("DB_PORT", "5432"),
        ("DB_USER", "svc"),
        ("DB_PASSWORD", "db-password"),
        ("DB_NAME", "users"),
        ("BROKER_HOST", "broker.internal"),
        ("BROKER_PORT", "4222"),
        ("BROKER_USERNAME", "publisher"),
        ("BROKER_PASSWORD", "broker-password"),
        ("BROKER_QUEUE", "users"),
        ("HEALTH_SERVICE_BASE_URL", "http://health:3000"),
        ("HEALTH_SERVICE_API_PREFIX", "/api/health"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_owned(), value.to_owned()))
    .collect()
}

/// Environment double answering from `vars`.
pub(crate) fn mock_env(vars: HashMap<String, String>) -> MockEnv {
    let mut env = MockEnv::new();
    env.expect_string()
        .times(0..)
        .returning(move |key| vars.get(key).cloned());
    env
}

/// Validated configuration for the named environment.
pub(crate) fn app_config(environment: &str) -> AppConfig {
    AppConfig::from_env(&mock_env(complete_env(environment)))
        .expect("fixture environment is complete")
}
