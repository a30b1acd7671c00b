//! Signed session tokens for operator logins.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};

/// Claims carried inside a session token.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    /// Authenticated subject (operator username).
    pub sub: String,
    /// Expiry as a unix timestamp.
    pub exp: i64,
}

/// Mints and verifies `payload.signature` bearer tokens.
///
/// The signature is a keyed SHA-256 over the encoded payload. This is the
/// gateway-local session format; federating identity across services is the
/// job of a real identity provider, not this signer.
pub struct TokenSigner {
    secret: String,
}

impl TokenSigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    /// Mint a token for `subject` valid for `ttl`.
    pub fn mint(&self, subject: &str, ttl: Duration) -> String {
        let claims = Claims {
            sub: subject.to_string(),
            exp: (Utc::now() + ttl).timestamp(),
        };
        // Claims serialization cannot fail: plain string + integer fields.
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap_or_default());
        let signature = self.sign(&payload);
        format!("{payload}.{signature}")
    }

    /// Verify signature and expiry; returns the claims when valid.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        let (payload, signature) = token.split_once('.')?;
        if !constant_time_eq(self.sign(payload).as_bytes(), signature.as_bytes()) {
            return None;
        }
        let raw = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let claims: Claims = serde_json::from_slice(&raw).ok()?;
        if claims.exp <= Utc::now().timestamp() {
            return None;
        }
        Some(claims)
    }

    fn sign(&self, payload: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b".");
        hasher.update(payload.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

/// Length-then-bytes comparison without early exit on mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
