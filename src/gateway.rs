//! Gateway façade composing the control-plane components.
//!
//! Constructed once at startup and handed to every handler by `Arc`; there
//! are no ambient singletons. A `/process` call walks the pipeline
//! authorize → admit (rate limit) → enabled (kill switch) → dispatch, and
//! every terminal dispatch outcome is recorded exactly once.

use std::sync::Arc;
use std::time::Instant;

use crate::auth::{ApiKey, CredentialStore};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::health::HealthMonitor;
use crate::routing::{AiRequest, Dispatcher};
use crate::security::{KillSwitch, RateLimiter};
use crate::storage::JsonStore;

/// Authenticated caller identity, derived by the HTTP layer from either an
/// API key or a signed operator session.
#[derive(Debug, Clone)]
pub struct Caller {
    pub subject: String,
    pub permissions: Vec<String>,
}

impl Caller {
    /// Operator sessions carry the full permission set.
    pub fn operator(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            permissions: vec!["admin".into(), "ai:read".into(), "ai:write".into()],
        }
    }

    pub fn from_key(key: &ApiKey) -> Self {
        Self {
            subject: key.owner.clone(),
            permissions: key.permissions.clone(),
        }
    }

    pub fn allows(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn require(&self, permission: &str) -> Result<(), GatewayError> {
        if self.allows(permission) {
            Ok(())
        } else {
            Err(GatewayError::Authorization(permission.to_string()))
        }
    }
}

/// Successful `/process` outcome.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub result: serde_json::Value,
    pub response_time_ms: u64,
    pub processed_by: String,
}

/// The assembled control plane.
pub struct Gateway {
    credentials: CredentialStore,
    rate_limiter: RateLimiter,
    kill_switch: KillSwitch,
    health: Arc<HealthMonitor>,
    dispatcher: Dispatcher,
    rate_window: std::time::Duration,
}

impl Gateway {
    /// Build every component from config and restore persisted state.
    pub async fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let store = JsonStore::new(&config.storage.state_dir);
        store.ensure_dir().await?;

        let credentials = CredentialStore::load(store.clone()).await?;
        let kill_switch = KillSwitch::load(store.clone()).await;
        let health = Arc::new(
            HealthMonitor::load(store, &config.backend.base_url, &config.health_check).await,
        );
        let rate_window = std::time::Duration::from_secs(config.rate_limit.window_secs);

        Ok(Self {
            credentials,
            rate_limiter: RateLimiter::new(rate_window, config.rate_limit.max_requests),
            kill_switch,
            health,
            dispatcher: Dispatcher::new(&config.backend),
            rate_window,
        })
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn kill_switch(&self) -> &KillSwitch {
        &self.kill_switch
    }

    pub fn health(&self) -> &Arc<HealthMonitor> {
        &self.health
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run one request through the pipeline.
    ///
    /// Rejections (authorization, admission, kill switch, malformed
    /// priority) happen before any backend traffic and leave the health
    /// counters untouched. Once dispatched, the outcome — success, backend
    /// error, or gateway timeout — is recorded exactly once.
    pub async fn process(
        &self,
        caller: &Caller,
        request: AiRequest,
    ) -> Result<ProcessOutcome, GatewayError> {
        caller.require("ai:write")?;

        if !(1..=10).contains(&request.priority) {
            return Err(GatewayError::InvalidRequest(format!(
                "priority {} outside 1..=10",
                request.priority
            )));
        }

        if !self.rate_limiter.allow(&caller.subject) {
            tracing::warn!(subject = %caller.subject, "rate limit exceeded");
            return Err(GatewayError::RateLimited);
        }

        if self.kill_switch.is_disabled() {
            let reason = self
                .kill_switch
                .status()
                .and_then(|f| f.reason)
                .unwrap_or_else(|| "disabled by operator".into());
            return Err(GatewayError::ServiceDisabled { reason });
        }

        let started = Instant::now();
        let result = self.dispatcher.forward(&request).await;
        let elapsed = started.elapsed();

        self.health.record(result.is_ok(), elapsed).await;

        let value = result?;
        tracing::info!(
            subject = %caller.subject,
            operation = %request.operation,
            elapsed_ms = elapsed.as_millis() as u64,
            "request completed"
        );

        Ok(ProcessOutcome {
            result: value,
            response_time_ms: elapsed.as_millis() as u64,
            processed_by: self.dispatcher.backend_label().to_string(),
        })
    }

    /// Housekeeping loop: evicts idle rate-limiter identities once per
    /// window until shutdown fires.
    pub async fn run_maintenance(&self, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.rate_window);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.rate_limiter.sweep();
                }
                _ = shutdown.recv() => break,
            }
        }
    }
}
