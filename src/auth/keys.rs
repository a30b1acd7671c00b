//! API-key issuance and validation.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::GatewayError;
use crate::storage::{JsonStore, StoreError};

const REGISTRY_RECORD: &str = "keys";

/// A single issued credential. The token is the registry key and the secret
/// shown to the caller exactly once, at issuance.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ApiKey {
    pub token: String,
    pub owner: String,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub usage_count: u64,
}

impl ApiKey {
    /// Exact-string membership test. Never hierarchical: "ai" does not
    /// grant "ai:write".
    pub fn allows(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    fn expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Durable registry of API keys.
///
/// The in-memory map is the source of truth for decisions; every mutation is
/// followed by a registry write. Issuance and revocation treat that write as
/// authoritative, validation treats it as telemetry-grade (a failed
/// usage-count write is logged but does not reject the caller).
pub struct CredentialStore {
    keys: Mutex<HashMap<String, ApiKey>>,
    store: JsonStore,
}

impl CredentialStore {
    /// Load the registry from disk. A corrupted record logs a warning and
    /// starts empty ("no keys" means no access, not a crash).
    pub async fn load(store: JsonStore) -> Result<Self, StoreError> {
        let keys = match store.load::<HashMap<String, ApiKey>>(REGISTRY_RECORD).await {
            Ok(Some(keys)) => keys,
            Ok(None) => HashMap::new(),
            Err(StoreError::Corrupt { name, source }) => {
                tracing::warn!(record = %name, error = %source, "key registry corrupt, starting empty");
                HashMap::new()
            }
            Err(e) => return Err(e),
        };
        tracing::info!(count = keys.len(), "API key registry loaded");
        Ok(Self {
            keys: Mutex::new(keys),
            store,
        })
    }

    /// Issue a new key for `owner` with the given permission set and TTL.
    ///
    /// Fail-closed: if the registry write fails the key is removed again and
    /// the caller gets an error, never a token that would vanish on restart.
    pub async fn issue(
        &self,
        owner: &str,
        permissions: Vec<String>,
        ttl_hours: i64,
    ) -> Result<ApiKey, GatewayError> {
        if ttl_hours <= 0 {
            return Err(GatewayError::InvalidRequest(
                "expires_in_hours must be positive".into(),
            ));
        }

        let now = Utc::now();
        // Checked arithmetic: expires_in_hours comes straight from an admin
        // request body and must not be able to overflow the calendar.
        let expires_at = Duration::try_hours(ttl_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                GatewayError::InvalidRequest("expires_in_hours out of range".into())
            })?;
        let key = ApiKey {
            token: generate_token(),
            owner: owner.to_string(),
            permissions,
            created_at: now,
            expires_at,
            usage_count: 0,
        };

        let snapshot = {
            let mut keys = lock(&self.keys);
            keys.insert(key.token.clone(), key.clone());
            keys.clone()
        };

        if let Err(e) = self.store.save(REGISTRY_RECORD, &snapshot).await {
            lock(&self.keys).remove(&key.token);
            tracing::error!(owner, error = %e, "key issuance rolled back: registry write failed");
            return Err(GatewayError::Persistence(e));
        }

        tracing::info!(owner, expires_at = %key.expires_at, "API key issued");
        Ok(key)
    }

    /// Validate a token: present and unexpired returns the record with its
    /// usage count bumped; an expired record is deleted (lazily, idempotent).
    pub async fn validate(&self, token: &str) -> Option<ApiKey> {
        self.validate_at(token, Utc::now()).await
    }

    /// Validation against an explicit clock, so expiry is testable without
    /// waiting an hour.
    pub async fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Option<ApiKey> {
        let (result, snapshot) = {
            let mut keys = lock(&self.keys);
            match keys.get_mut(token) {
                None => return None,
                Some(key) if key.expired_at(now) => {
                    let owner = key.owner.clone();
                    keys.remove(token);
                    tracing::info!(owner, "expired API key removed");
                    (None, keys.clone())
                }
                Some(key) => {
                    key.usage_count += 1;
                    (Some(key.clone()), keys.clone())
                }
            }
        };

        // Usage counters and lazy deletions are telemetry-grade: the
        // admission decision stands even if this write fails.
        if let Err(e) = self.store.save(REGISTRY_RECORD, &snapshot).await {
            tracing::warn!(error = %e, "key registry write failed after validate");
        }

        result
    }

    /// Remove a key explicitly (admin action). Returns whether it existed.
    pub async fn revoke(&self, token: &str) -> Result<bool, GatewayError> {
        let (existed, snapshot) = {
            let mut keys = lock(&self.keys);
            let existed = keys.remove(token).is_some();
            (existed, keys.clone())
        };
        if existed {
            self.store.save(REGISTRY_RECORD, &snapshot).await?;
            tracing::info!("API key revoked");
        }
        Ok(existed)
    }

    /// Number of live (possibly expired-but-unswept) keys.
    pub fn count(&self) -> usize {
        lock(&self.keys).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// 32 random bytes, URL-safe base64. Prefixed so keys are recognizable in
/// logs and support tickets without revealing anything.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("agw_{}", URL_SAFE_NO_PAD.encode(bytes))
}
