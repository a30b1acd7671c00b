//! Configuration validation.
//!
//! Semantic checks on top of serde's syntactic ones. Returns all violations
//! at once so an operator can fix a config file in a single pass.

use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

fn violation(errors: &mut Vec<ValidationError>, field: &str, message: impl Into<String>) {
    errors.push(ValidationError {
        field: field.to_string(),
        message: message.into(),
    });
}

/// Validate a configuration. Pure function; collects every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.backend.base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => violation(
            &mut errors,
            "backend.base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        ),
        Err(e) => violation(&mut errors, "backend.base_url", e.to_string()),
    }

    if config.backend.request_timeout_secs == 0 {
        violation(&mut errors, "backend.request_timeout_secs", "must be positive");
    }
    if config.backend.max_concurrent_requests == 0 {
        violation(&mut errors, "backend.max_concurrent_requests", "must be positive");
    }
    if config.rate_limit.window_secs == 0 {
        violation(&mut errors, "rate_limit.window_secs", "must be positive");
    }
    if config.rate_limit.max_requests == 0 {
        violation(&mut errors, "rate_limit.max_requests", "must be positive");
    }
    if config.health_check.enabled && config.health_check.interval_secs == 0 {
        violation(&mut errors, "health_check.interval_secs", "must be positive");
    }
    if config.health_check.latency_history == 0 {
        violation(&mut errors, "health_check.latency_history", "must be positive");
    }
    if config.auth.token_ttl_hours <= 0 {
        violation(&mut errors, "auth.token_ttl_hours", "must be positive");
    }
    // Operator logins mint signed session tokens; an empty signing key would
    // make every signature forgeable.
    let login_enabled =
        !config.auth.admin_username.is_empty() || !config.auth.admin_password.is_empty();
    if login_enabled && config.auth.token_secret.is_empty() {
        violation(
            &mut errors,
            "auth.token_secret",
            "must be set when operator credentials are configured",
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors_not_just_first() {
        let mut config = GatewayConfig::default();
        config.backend.base_url = "not a url".into();
        config.rate_limit.max_requests = 0;
        config.backend.request_timeout_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn operator_credentials_require_a_token_secret() {
        let mut config = GatewayConfig::default();
        config.auth.admin_username = "ops".into();
        config.auth.admin_password = "hunter2".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "auth.token_secret");

        config.auth.token_secret = "sekrit".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_non_http_scheme() {
        let mut config = GatewayConfig::default();
        config.backend.base_url = "ftp://backend:21".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "backend.base_url");
    }
}
