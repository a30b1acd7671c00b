//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! POST /auth/login:
//!     login.rs (IdentityProvider verifies operator credentials)
//!     → token.rs (mint signed, expiring session token)
//!
//! Authenticated request:
//!     Bearer header
//!     → token.rs (verify signature + expiry)  — operator session
//!     → keys.rs  (validate API key, lazy expiry, usage bump) — API caller
//!
//! POST /auth/api-key (admin):
//!     keys.rs issue() → persist registry → return token once
//! ```
//!
//! # Design Decisions
//! - API keys are opaque random secrets; permissions are exact-match strings
//! - Expired keys are deleted lazily on validate (idempotent not-found)
//! - Issuance is fail-closed: no registry write, no token
//! - The identity provider is a trait; the shipped implementation reads
//!   operator credentials from config and never hard-codes any

pub mod keys;
pub mod login;
pub mod token;

pub use keys::{ApiKey, CredentialStore};
pub use login::{IdentityProvider, StaticIdentityProvider};
pub use token::TokenSigner;
