//! Bearer-token authentication.

use axum::http::{header, HeaderMap};

use crate::error::GatewayError;
use crate::gateway::Caller;
use crate::http::server::AppState;

/// Resolve the caller behind a request.
///
/// Both credential kinds travel in the same `Authorization: Bearer` header:
/// a signed operator session is checked first (a pure signature check, no
/// I/O), then the API-key registry. The error message never says which
/// lookup failed.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Caller, GatewayError> {
    let token = bearer(headers)
        .ok_or_else(|| GatewayError::Authentication("missing bearer token".into()))?;

    if let Some(claims) = state.signer.verify(token) {
        return Ok(Caller::operator(claims.sub));
    }

    if let Some(key) = state.gateway.credentials().validate(token).await {
        return Ok(Caller::from_key(&key));
    }

    Err(GatewayError::Authentication(
        "invalid or expired credential".into(),
    ))
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
