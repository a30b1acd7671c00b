//! HTTP control surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, body limits, trace + request-id layers)
//!     → request.rs (attach x-request-id)
//!     → extract.rs (bearer token → Caller)
//!     → handlers.rs (endpoint logic → Gateway)
//!     → GatewayError::into_response on any rejection
//! ```

pub mod extract;
pub mod handlers;
pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
