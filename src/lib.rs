//! Aegis AI Gateway Library
//!
//! Control plane for an AI-request gateway: authenticates callers, applies
//! sliding-window rate limits, health-checks the AI backend, and routes
//! operations to it with priority-based timeouts. The backend itself is
//! opaque beyond its HTTP contract.

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod routing;
pub mod security;
pub mod storage;

pub use config::schema::GatewayConfig;
pub use error::GatewayError;
pub use gateway::Gateway;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
