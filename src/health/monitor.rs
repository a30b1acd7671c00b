//! Backend liveness probing and request-outcome statistics.

use axum::body::Body;
use axum::http::Request;
use chrono::{DateTime, Utc};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::storage::{JsonStore, StoreError};

const STATS_RECORD: &str = "stats";

/// Backend liveness classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendHealth {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

impl BackendHealth {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendHealth::Healthy => "healthy",
            BackendHealth::Degraded => "degraded",
            BackendHealth::Unhealthy => "unhealthy",
            BackendHealth::Unknown => "unknown",
        }
    }
}

/// Operational statistics, persisted after every mutation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HealthStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Most recent request latencies in milliseconds, oldest first.
    pub recent_latencies_ms: VecDeque<u64>,
    pub backend_health: BackendHealth,
    pub last_check: Option<DateTime<Utc>>,
    pub uptime_start: DateTime<Utc>,
}

impl HealthStats {
    fn fresh() -> Self {
        Self {
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            recent_latencies_ms: VecDeque::new(),
            backend_health: BackendHealth::Unknown,
            last_check: None,
            uptime_start: Utc::now(),
        }
    }

    /// Fraction of successful requests; 0.0 when nothing was recorded yet.
    pub fn success_rate(&self) -> f64 {
        self.successful_requests as f64 / std::cmp::max(self.total_requests, 1) as f64
    }

    /// Rolling average over the bounded latency buffer.
    pub fn average_latency_ms(&self) -> f64 {
        if self.recent_latencies_ms.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.recent_latencies_ms.iter().sum();
        sum as f64 / self.recent_latencies_ms.len() as f64
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.uptime_start).num_seconds().max(0)
    }
}

/// Records dispatch outcomes and probes the backend out of band.
pub struct HealthMonitor {
    stats: Mutex<HealthStats>,
    store: JsonStore,
    client: Client<HttpConnector, Body>,
    probe_uri: String,
    interval: Duration,
    probe_timeout: Duration,
    history: usize,
}

impl HealthMonitor {
    /// Restore persisted counters (corruption starts fresh with a warning)
    /// and reset the uptime clock for this process.
    pub async fn load(store: JsonStore, backend_base_url: &str, config: &HealthCheckConfig) -> Self {
        let mut stats = match store.load::<HealthStats>(STATS_RECORD).await {
            Ok(Some(stats)) => stats,
            Ok(None) => HealthStats::fresh(),
            Err(StoreError::Corrupt { name, source }) => {
                tracing::warn!(record = %name, error = %source, "stats record corrupt, starting fresh");
                HealthStats::fresh()
            }
            Err(e) => {
                tracing::warn!(error = %e, "stats record unreadable, starting fresh");
                HealthStats::fresh()
            }
        };
        stats.uptime_start = Utc::now();
        stats.backend_health = BackendHealth::Unknown;

        let probe_uri = format!(
            "{}{}",
            backend_base_url.trim_end_matches('/'),
            config.path
        );

        Self {
            stats: Mutex::new(stats),
            store,
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
            probe_uri,
            interval: Duration::from_secs(config.interval_secs),
            probe_timeout: Duration::from_secs(config.timeout_secs),
            history: config.latency_history,
        }
    }

    /// Record one terminal dispatch outcome. Counter mutation happens under
    /// a narrow lock; the follow-up stats write is telemetry-grade and never
    /// fails the triggering request.
    pub async fn record(&self, success: bool, latency: Duration) {
        let snapshot = {
            let mut stats = lock(&self.stats);
            stats.total_requests += 1;
            if success {
                stats.successful_requests += 1;
            } else {
                stats.failed_requests += 1;
            }
            stats.recent_latencies_ms.push_back(latency.as_millis() as u64);
            while stats.recent_latencies_ms.len() > self.history {
                stats.recent_latencies_ms.pop_front();
            }
            stats.clone()
        };
        self.persist(&snapshot).await;
    }

    /// Current statistics.
    pub fn snapshot(&self) -> HealthStats {
        lock(&self.stats).clone()
    }

    /// Periodic probe loop. Runs until the shutdown broadcast fires; the
    /// atomic stats writes mean cancellation cannot tear the record.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            probe = %self.probe_uri,
            "health monitor starting"
        );

        let mut ticker = time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.probe_once().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// One liveness probe: 2xx is healthy, any other answer is degraded,
    /// no answer (transport error or probe timeout) is unhealthy.
    pub async fn probe_once(&self) {
        let state = match self.issue_probe().await {
            Ok(status) if status.is_success() => BackendHealth::Healthy,
            Ok(status) => {
                tracing::warn!(status = %status, "backend probe returned non-success");
                BackendHealth::Degraded
            }
            Err(reason) => {
                tracing::warn!(reason, "backend probe got no response");
                BackendHealth::Unhealthy
            }
        };

        let snapshot = {
            let mut stats = lock(&self.stats);
            stats.backend_health = state;
            stats.last_check = Some(Utc::now());
            stats.clone()
        };
        self.persist(&snapshot).await;
    }

    async fn issue_probe(&self) -> Result<axum::http::StatusCode, &'static str> {
        let request = Request::builder()
            .method("GET")
            .uri(&self.probe_uri)
            .header("user-agent", "aegis-gateway-health-check")
            .body(Body::empty())
            .map_err(|_| "invalid probe uri")?;

        match time::timeout(self.probe_timeout, self.client.request(request)).await {
            Ok(Ok(response)) => Ok(response.status()),
            Ok(Err(_)) => Err("connection error"),
            Err(_) => Err("timeout"),
        }
    }

    async fn persist(&self, snapshot: &HealthStats) {
        if let Err(e) = self.store.save(STATS_RECORD, snapshot).await {
            tracing::warn!(error = %e, "stats write failed");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
