//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with all endpoints
//! - Wire up middleware (tracing, body limits, request ID)
//! - Spawn the health-probe and rate-limiter maintenance tasks
//! - Serve with graceful shutdown on the broadcast signal

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::auth::{IdentityProvider, TokenSigner};
use crate::config::GatewayConfig;
use crate::gateway::Gateway;
use crate::http::{handlers, request};
use crate::lifecycle::Shutdown;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub signer: Arc<TokenSigner>,
    pub identity: Arc<dyn IdentityProvider>,
    pub config: Arc<GatewayConfig>,
}

/// HTTP server for the gateway control plane.
pub struct HttpServer {
    router: Router,
    gateway: Arc<Gateway>,
    probe_enabled: bool,
}

impl HttpServer {
    pub fn new(
        config: GatewayConfig,
        gateway: Arc<Gateway>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let signer = Arc::new(TokenSigner::new(config.auth.token_secret.clone()));
        let probe_enabled = config.health_check.enabled;
        let config = Arc::new(config);
        let state = AppState {
            gateway: gateway.clone(),
            signer,
            identity,
            config: config.clone(),
        };

        Self {
            router: Self::build_router(&config, state),
            gateway,
            probe_enabled,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/status", get(handlers::status))
            .route("/health", get(handlers::health))
            .route("/auth/login", post(handlers::login))
            .route("/auth/api-key", post(handlers::issue_api_key))
            .route("/auth/api-key/{token}", delete(handlers::revoke_api_key))
            .route("/disable", post(handlers::set_disabled))
            .route("/process", post(handlers::process))
            .route("/analytics", get(handlers::analytics))
            .layer(DefaultBodyLimit::max(config.listener.max_body_size))
            .layer(axum::middleware::from_fn(request::request_id_middleware))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Run the server on the given listener until shutdown fires.
    ///
    /// Also owns the background tasks tied to the server's lifetime: the
    /// backend liveness probe (when enabled) and the rate-limiter sweep.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if self.probe_enabled {
            let gateway = self.gateway.clone();
            let rx = shutdown.subscribe();
            tokio::spawn(async move {
                gateway.health().run(rx).await;
            });
        }

        let gateway = self.gateway.clone();
        let rx = shutdown.subscribe();
        tokio::spawn(async move {
            gateway.run_maintenance(rx).await;
        });

        let mut rx = shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = rx.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
