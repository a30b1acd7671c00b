//! Health monitoring subsystem.
//!
//! # Data Flow
//! ```text
//! Per-request (passive):
//!     dispatch outcome
//!     → monitor.rs record(success, latency)
//!     → counters + rolling latency buffer
//!     → persist stats (non-fatal on failure)
//!
//! Periodic (active):
//!     interval timer → probe backend liveness path
//!     → classify: 2xx = healthy, non-2xx = degraded, no answer = unhealthy
//!     → update state + last_check, persist
//! ```
//!
//! # Design Decisions
//! - Counters are monotonic; only the latency buffer is bounded FIFO
//! - The probe task is cancellable via the shutdown broadcast
//! - success_rate divides by max(total, 1); zero traffic reads as 0.0

pub mod monitor;

pub use monitor::{BackendHealth, HealthMonitor, HealthStats};
