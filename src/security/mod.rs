//! Admission control subsystem.
//!
//! # Data Flow
//! ```text
//! Authenticated request:
//!     → rate_limit.rs (sliding-window admission per identity)
//!     → kill_switch.rs (durable disable gate)
//!     → pass to routing
//! ```
//!
//! # Design Decisions
//! - Fail closed: an unreadable kill-switch record counts as disabled
//! - Rate decisions are pure in-memory; durability never gates admission
//! - Per-identity windows are serialized, identities stay parallel

pub mod kill_switch;
pub mod rate_limit;

pub use kill_switch::{DisableFlag, KillSwitch};
pub use rate_limit::RateLimiter;
