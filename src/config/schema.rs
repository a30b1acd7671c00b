//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the AI gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// AI backend this gateway fronts.
    pub backend: BackendConfig,

    /// Credential and token settings.
    pub auth: AuthConfig,

    /// Sliding-window rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Backend health probing.
    pub health_check: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Durable state location.
    pub storage: StorageConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

/// AI backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the AI-processing service (e.g., "http://127.0.0.1:8001").
    pub base_url: String,

    /// Base request timeout in seconds. Priorities 1-5 get this budget,
    /// priorities 6-10 get twice it.
    pub request_timeout_secs: u64,

    /// Maximum concurrent in-flight backend requests.
    pub max_concurrent_requests: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8001".to_string(),
            request_timeout_secs: 30,
            max_concurrent_requests: 64,
        }
    }
}

/// Credential and token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Secret used to sign login session tokens.
    pub token_secret: String,

    /// Lifetime of a login session token in hours.
    pub token_ttl_hours: i64,

    /// Operator username accepted by the built-in identity provider.
    /// Empty means login is disabled until a real provider is wired in.
    pub admin_username: String,

    /// Operator password accepted by the built-in identity provider.
    pub admin_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            token_ttl_hours: 12,
            admin_username: String::new(),
            admin_password: String::new(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Sliding window length in seconds.
    pub window_secs: u64,

    /// Maximum admitted requests per identity within one window.
    pub max_requests: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            max_requests: 100,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable the periodic liveness probe.
    pub enabled: bool,

    /// Probe interval in seconds.
    pub interval_secs: u64,

    /// Probe timeout in seconds.
    pub timeout_secs: u64,

    /// Path probed on the backend.
    pub path: String,

    /// Number of recent latencies kept for the rolling average.
    pub latency_history: usize,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
            timeout_secs: 5,
            path: "/health".to_string(),
            latency_history: 100,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level filter (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Durable state configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the key registry, gateway stats, and kill switch.
    pub state_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: "./state".to_string(),
        }
    }
}
