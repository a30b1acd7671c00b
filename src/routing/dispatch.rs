//! Backend forwarding under a priority-derived deadline.

use axum::body::Body;
use axum::http::{header, Request};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time;
use url::Url;

use crate::config::BackendConfig;
use crate::error::GatewayError;
use crate::routing::table::{timeout_for, RouteTable};
use crate::routing::AiRequest;

/// Cap on buffered backend response bodies.
const MAX_RESPONSE_BYTES: usize = 2 * 1024 * 1024;

/// Forwards one request to the backend, at most once.
///
/// Concurrency is capped by a semaphore sized from config so a slow backend
/// cannot absorb every gateway task. No lock is held while the call is in
/// flight; the only suspension points are the permit and the network I/O.
pub struct Dispatcher {
    client: Client<HttpConnector, Body>,
    base_url: String,
    routes: RouteTable,
    base_timeout: Duration,
    permits: Semaphore,
    backend_label: String,
}

impl Dispatcher {
    pub fn new(config: &BackendConfig) -> Self {
        let backend_label = Url::parse(&config.base_url)
            .ok()
            .and_then(|u| u.host_str().map(ToString::to_string))
            .unwrap_or_else(|| config.base_url.clone());

        Self {
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            routes: RouteTable::standard(),
            base_timeout: Duration::from_secs(config.request_timeout_secs),
            permits: Semaphore::new(config.max_concurrent_requests),
            backend_label,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Host label reported in /process responses.
    pub fn backend_label(&self) -> &str {
        &self.backend_label
    }

    /// Forward `request.data` to the operation's backend route and return the
    /// decoded response body.
    ///
    /// Exactly one of four outcomes: decoded 2xx body, `BackendTimeout`
    /// (deadline hit, distinct from anything the backend said), `Backend`
    /// (non-2xx passed through), or `BackendUnreachable` (transport failure).
    pub async fn forward(&self, request: &AiRequest) -> Result<serde_json::Value, GatewayError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| GatewayError::Internal("dispatcher shut down".into()))?;

        let path = self.routes.resolve(&request.operation);
        let uri = format!("{}{}", self.base_url, path);
        let deadline = timeout_for(request.priority, self.base_timeout);

        let body = serde_json::to_vec(&request.data)
            .map_err(|e| GatewayError::Internal(format!("payload encode: {e}")))?;
        let outbound = Request::builder()
            .method("POST")
            .uri(&uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .map_err(|e| GatewayError::Internal(format!("request build: {e}")))?;

        tracing::debug!(
            operation = %request.operation,
            uri = %uri,
            priority = request.priority,
            timeout_ms = deadline.as_millis() as u64,
            "dispatching to backend"
        );

        // The deadline covers the whole exchange; a backend that answers
        // headers promptly but trickles the body gets no extra budget.
        let exchange = async {
            let response = self
                .client
                .request(outbound)
                .await
                .map_err(|e| GatewayError::BackendUnreachable(e.to_string()))?;
            let status = response.status();
            let bytes = axum::body::to_bytes(Body::new(response.into_body()), MAX_RESPONSE_BYTES)
                .await
                .map_err(|e| GatewayError::BackendUnreachable(e.to_string()))?;
            Ok::<_, GatewayError>((status, bytes))
        };

        let (status, bytes) = match time::timeout(deadline, exchange).await {
            Ok(Ok(answer)) => answer,
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(GatewayError::BackendTimeout(deadline)),
        };

        if status.is_success() {
            let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                serde_json::json!({ "raw": String::from_utf8_lossy(&bytes) })
            });
            Ok(value)
        } else {
            let detail = String::from_utf8_lossy(&bytes).chars().take(512).collect();
            Err(GatewayError::Backend {
                status: status.as_u16(),
                detail,
            })
        }
    }
}
