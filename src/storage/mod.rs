//! Durable state subsystem.
//!
//! # Data Flow
//! ```text
//! Mutation (keys / stats / kill switch):
//!     in-memory update under lock
//!     → serialize snapshot
//!     → json_store.rs (write temp file, atomic rename)
//!
//! Startup:
//!     json_store.rs (read + parse)
//!     → subsystem decides fail-open (registry, stats)
//!       or fail-closed (kill switch) on corruption
//! ```
//!
//! # Design Decisions
//! - One JSON document per record kind; no database dependency
//! - Atomic rename so a cancelled writer never leaves a torn record
//! - Missing file is a normal state (None), corruption is a typed error

pub mod json_store;

pub use json_store::{JsonStore, StoreError};
