//! Endpoint handlers.
//!
//! Thin layer: parse, authenticate, delegate to the `Gateway`, serialize.
//! Anything resembling a decision lives in the components, not here.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::health::BackendHealth;
use crate::http::extract::authenticate;
use crate::http::server::AppState;
use crate::routing::AiRequest;
use crate::security::DisableFlag;

/// GET /status — public service summary.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let stats = state.gateway.health().snapshot();
    let disabled = state.gateway.kill_switch().status();

    Json(StatusResponse {
        service: "aegis-gateway",
        version: env!("CARGO_PKG_VERSION"),
        status: if disabled.is_some() { "disabled" } else { "ok" },
        uptime_seconds: stats.uptime_seconds(),
        backend_health: stats.backend_health.as_str(),
        last_health_check: stats.last_check,
        rate_limit: RateLimitInfo {
            window_secs: state.config.rate_limit.window_secs,
            max_requests: state.config.rate_limit.max_requests,
        },
        operations: state.gateway.dispatcher().routes().operations(),
        disabled,
    })
}

/// GET /health — public liveness for load balancers.
///
/// Always 200: the gateway process answering is the liveness signal. The
/// body reports whether traffic would currently get through.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.gateway.health().snapshot();
    let status = if state.gateway.kill_switch().is_disabled() {
        "disabled"
    } else {
        match stats.backend_health {
            BackendHealth::Healthy | BackendHealth::Unknown => "healthy",
            BackendHealth::Degraded | BackendHealth::Unhealthy => "degraded",
        }
    };

    Json(HealthResponse {
        gateway: "healthy",
        backend: stats.backend_health.as_str(),
        status,
        uptime_seconds: stats.uptime_seconds(),
    })
}

/// POST /auth/login — exchange operator credentials for a session token.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, GatewayError> {
    if !state.identity.verify(&body.username, &body.password) {
        tracing::warn!(username = %body.username, "login rejected");
        return Err(GatewayError::Authentication("invalid credentials".into()));
    }

    let ttl_hours = state.config.auth.token_ttl_hours;
    let token = state
        .signer
        .mint(&body.username, chrono::Duration::hours(ttl_hours));
    tracing::info!(username = %body.username, "operator session issued");

    Ok(Json(LoginResponse {
        success: true,
        token,
        expires_in_hours: ttl_hours,
    }))
}

/// POST /auth/api-key — issue a key (admin only).
pub async fn issue_api_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<IssueKeyRequest>,
) -> Result<Json<IssueKeyResponse>, GatewayError> {
    let caller = authenticate(&state, &headers).await?;
    caller.require("admin")?;

    let key = state
        .gateway
        .credentials()
        .issue(&body.name, body.permissions, body.expires_in_hours)
        .await?;

    Ok(Json(IssueKeyResponse {
        success: true,
        api_key: key.token,
        name: key.owner,
        permissions: key.permissions,
        expires_in_hours: body.expires_in_hours,
        expires_at: key.expires_at,
    }))
}

/// DELETE /auth/api-key/{token} — revoke a key (admin only).
pub async fn revoke_api_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(token): Path<String>,
) -> Result<Json<RevokeKeyResponse>, GatewayError> {
    let caller = authenticate(&state, &headers).await?;
    caller.require("admin")?;

    let revoked = state.gateway.credentials().revoke(&token).await?;
    Ok(Json(RevokeKeyResponse {
        success: true,
        revoked,
    }))
}

/// POST /disable — engage or release the kill switch (admin only).
pub async fn set_disabled(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<DisableRequest>,
) -> Result<Json<DisableResponse>, GatewayError> {
    let caller = authenticate(&state, &headers).await?;
    caller.require("admin")?;

    let flag = state
        .gateway
        .kill_switch()
        .set(body.disable, &caller.subject, body.reason)
        .await?;

    Ok(Json(DisableResponse {
        success: true,
        disabled: body.disable,
        flag,
    }))
}

/// POST /process — run one AI request through the pipeline.
pub async fn process(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AiRequest>,
) -> Result<Json<ProcessResponse>, GatewayError> {
    let caller = authenticate(&state, &headers).await?;
    let outcome = state.gateway.process(&caller, request).await?;

    Ok(Json(ProcessResponse {
        success: true,
        result: outcome.result,
        response_time_ms: outcome.response_time_ms,
        processed_by: outcome.processed_by,
    }))
}

/// GET /analytics — operational statistics (requires ai:read).
pub async fn analytics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AnalyticsResponse>, GatewayError> {
    let caller = authenticate(&state, &headers).await?;
    caller.require("ai:read")?;

    let stats = state.gateway.health().snapshot();
    Ok(Json(AnalyticsResponse {
        success: true,
        total_requests: stats.total_requests,
        successful_requests: stats.successful_requests,
        failed_requests: stats.failed_requests,
        success_rate: stats.success_rate(),
        average_latency_ms: stats.average_latency_ms(),
        uptime_seconds: stats.uptime_seconds(),
        backend_health: stats.backend_health.as_str(),
        active_api_keys: state.gateway.credentials().count(),
    }))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_seconds: i64,
    pub backend_health: &'static str,
    pub last_health_check: Option<DateTime<Utc>>,
    pub rate_limit: RateLimitInfo,
    pub operations: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<DisableFlag>,
}

#[derive(Debug, Serialize)]
pub struct RateLimitInfo {
    pub window_secs: u64,
    pub max_requests: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub gateway: &'static str,
    pub backend: &'static str,
    pub status: &'static str,
    pub uptime_seconds: i64,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub expires_in_hours: i64,
}

#[derive(Debug, Deserialize)]
pub struct IssueKeyRequest {
    pub name: String,
    pub permissions: Vec<String>,
    #[serde(default = "default_key_ttl_hours")]
    pub expires_in_hours: i64,
}

fn default_key_ttl_hours() -> i64 {
    24
}

#[derive(Debug, Serialize)]
pub struct IssueKeyResponse {
    pub success: bool,
    pub api_key: String,
    pub name: String,
    pub permissions: Vec<String>,
    pub expires_in_hours: i64,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct RevokeKeyResponse {
    pub success: bool,
    pub revoked: bool,
}

#[derive(Debug, Deserialize)]
pub struct DisableRequest {
    pub disable: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DisableResponse {
    pub success: bool,
    pub disabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<DisableFlag>,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub result: serde_json::Value,
    pub response_time_ms: u64,
    pub processed_by: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub success: bool,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub average_latency_ms: f64,
    pub uptime_seconds: i64,
    pub backend_health: &'static str,
    pub active_api_keys: usize,
}
