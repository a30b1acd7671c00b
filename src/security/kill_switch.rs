//! Durable kill switch gating all backend traffic.

use chrono::{DateTime, Utc};
use std::sync::Mutex;

use crate::error::GatewayError;
use crate::storage::JsonStore;

const FLAG_RECORD: &str = "kill_switch";

/// Persisted disable record. Absence of the record means enabled.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DisableFlag {
    pub is_disabled: bool,
    pub disabled_at: DateTime<Utc>,
    pub disabled_by: String,
    pub reason: Option<String>,
}

/// Operator-controlled gate checked synchronously before every dispatch.
///
/// Writes are authoritative: a disable that cannot be persisted is reported
/// as an error and does not take effect half-way. Reads come from the cached
/// flag, loaded once at startup.
pub struct KillSwitch {
    flag: Mutex<Option<DisableFlag>>,
    store: JsonStore,
}

impl KillSwitch {
    /// Load the persisted flag. Fail-closed: a record that exists but cannot
    /// be read is treated as disabled until an operator explicitly re-enables.
    pub async fn load(store: JsonStore) -> Self {
        let flag = match store.load::<DisableFlag>(FLAG_RECORD).await {
            Ok(flag) => flag,
            Err(e) => {
                tracing::error!(error = %e, "kill-switch record unreadable, failing closed");
                Some(DisableFlag {
                    is_disabled: true,
                    disabled_at: Utc::now(),
                    disabled_by: "gateway".into(),
                    reason: Some("persisted kill-switch record unreadable".into()),
                })
            }
        };
        if let Some(flag) = &flag {
            tracing::warn!(
                disabled_by = %flag.disabled_by,
                reason = flag.reason.as_deref().unwrap_or(""),
                "gateway starting with kill switch engaged"
            );
        }
        Self {
            flag: Mutex::new(flag),
            store,
        }
    }

    /// Engage or release the switch. Disabling persists the flag; enabling
    /// deletes the record so a fresh deployment starts enabled.
    pub async fn set(
        &self,
        disabled: bool,
        actor: &str,
        reason: Option<String>,
    ) -> Result<Option<DisableFlag>, GatewayError> {
        if disabled {
            let flag = DisableFlag {
                is_disabled: true,
                disabled_at: Utc::now(),
                disabled_by: actor.to_string(),
                reason,
            };
            self.store.save(FLAG_RECORD, &flag).await?;
            *lock(&self.flag) = Some(flag.clone());
            tracing::warn!(actor, reason = flag.reason.as_deref().unwrap_or(""), "kill switch engaged");
            Ok(Some(flag))
        } else {
            self.store.delete(FLAG_RECORD).await?;
            *lock(&self.flag) = None;
            tracing::info!(actor, "kill switch released");
            Ok(None)
        }
    }

    pub fn is_disabled(&self) -> bool {
        lock(&self.flag).as_ref().is_some_and(|f| f.is_disabled)
    }

    /// Current flag, if engaged.
    pub fn status(&self) -> Option<DisableFlag> {
        lock(&self.flag).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
