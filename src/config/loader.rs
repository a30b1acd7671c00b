//! Configuration loading from disk and environment.

use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides, and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay the deployment knobs from environment variables.
///
/// Unset variables leave the file/default value in place; unparsable numeric
/// values are logged and ignored rather than silently zeroed.
pub fn apply_env_overrides(config: &mut GatewayConfig) {
    if let Ok(url) = std::env::var("AEGIS_BACKEND_URL") {
        config.backend.base_url = url;
    }
    if let Ok(secret) = std::env::var("AEGIS_TOKEN_SECRET") {
        config.auth.token_secret = secret;
    }
    if let Ok(user) = std::env::var("AEGIS_ADMIN_USERNAME") {
        config.auth.admin_username = user;
    }
    if let Ok(password) = std::env::var("AEGIS_ADMIN_PASSWORD") {
        config.auth.admin_password = password;
    }
    if let Ok(dir) = std::env::var("AEGIS_STATE_DIR") {
        config.storage.state_dir = dir;
    }

    override_parsed("AEGIS_RATE_WINDOW_SECS", &mut config.rate_limit.window_secs);
    override_parsed("AEGIS_RATE_MAX_REQUESTS", &mut config.rate_limit.max_requests);
    override_parsed("AEGIS_HEALTH_INTERVAL_SECS", &mut config.health_check.interval_secs);
    override_parsed("AEGIS_BACKEND_TIMEOUT_SECS", &mut config.backend.request_timeout_secs);
    override_parsed(
        "AEGIS_MAX_CONCURRENT_REQUESTS",
        &mut config.backend.max_concurrent_requests,
    );
}

fn override_parsed<T: std::str::FromStr>(var: &str, slot: &mut T) {
    if let Ok(raw) = std::env::var(var) {
        match raw.parse() {
            Ok(value) => *slot = value,
            Err(_) => tracing::warn!(var, raw, "ignoring unparsable environment override"),
        }
    }
}
