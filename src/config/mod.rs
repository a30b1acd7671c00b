//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides for operational knobs)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require restart
//! - All fields have defaults so a bare environment still boots
//! - Environment variables win over the file for deployment knobs
//!   (backend URL, token secret, rate limits, probe interval, timeouts)

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::AuthConfig;
pub use schema::BackendConfig;
pub use schema::GatewayConfig;
pub use schema::HealthCheckConfig;
pub use schema::ListenerConfig;
pub use schema::RateLimitConfig;
