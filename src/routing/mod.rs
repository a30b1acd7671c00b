//! Request routing subsystem.
//!
//! # Data Flow
//! ```text
//! AiRequest { operation, data, priority }
//!     → table.rs (operation → backend path, passthrough fallback)
//!     → table.rs (priority → timeout budget)
//!     → dispatch.rs (forward once under deadline, classify outcome)
//! ```
//!
//! # Design Decisions
//! - Both mappings are static tables, testable without a network
//! - Unmapped operations fall through to a generic /ai/{operation} route
//! - At-most-once forwarding: no retry loop, callers own retry policy

pub mod dispatch;
pub mod table;

pub use dispatch::Dispatcher;
pub use table::{timeout_for, RouteTable};

/// One inbound processing request. Transient; never persisted.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct AiRequest {
    /// Logical operation name, e.g. "predict" or "detect-anomalies".
    pub operation: String,
    /// Opaque payload forwarded to the backend.
    pub data: serde_json::Value,
    /// Priority 1-10; 6 and above doubles the timeout budget.
    pub priority: u8,
    /// Caller-supplied annotations. Accepted for API compatibility; the
    /// gateway does not forward them to the backend.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}
