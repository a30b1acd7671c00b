//! Gateway error taxonomy.
//!
//! Every rejection path maps to a distinct variant so callers can tell an
//! auth failure from a rate limit from a dead backend. Persistence errors
//! are authoritative for the key registry and kill switch; for telemetry
//! they are logged at the call site and never reach a response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::time::Duration;

use crate::storage::StoreError;

/// Errors surfaced by gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Missing, invalid, or expired credential.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Valid credential lacking a required permission.
    #[error("missing permission: {0}")]
    Authorization(String),

    /// Sliding-window admission rejected the caller.
    #[error("rate limit exceeded")]
    RateLimited,

    /// Kill switch is engaged; no backend traffic allowed.
    #[error("service disabled: {reason}")]
    ServiceDisabled { reason: String },

    /// Backend did not answer within the priority-derived deadline.
    #[error("backend timed out after {0:?}")]
    BackendTimeout(Duration),

    /// Backend answered with a non-2xx status; passed through verbatim.
    #[error("backend returned status {status}")]
    Backend { status: u16, detail: String },

    /// Backend unreachable (connect/transport failure).
    #[error("backend unreachable: {0}")]
    BackendUnreachable(String),

    /// Malformed request (e.g. priority outside 1..=10).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Durable-state write or read failure.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// Internal invariant violation (should not occur in normal operation).
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Authentication(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Authorization(_) => StatusCode::FORBIDDEN,
            GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::ServiceDisabled { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::BackendTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Backend { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            GatewayError::BackendUnreachable(_) => StatusCode::BAD_GATEWAY,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Persistence(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}
