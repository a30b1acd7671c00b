//! Operator credential verification.

use crate::config::AuthConfig;

/// External collaborator that decides whether a username/password pair is an
/// operator. Production deployments are expected to supply an implementation
/// backed by a real identity provider.
pub trait IdentityProvider: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// Config-backed provider. Credentials come from the operator's environment
/// or config file; when unset, every login is rejected so there is never a
/// baked-in default account.
pub struct StaticIdentityProvider {
    username: String,
    password: String,
}

impl StaticIdentityProvider {
    pub fn from_config(auth: &AuthConfig) -> Self {
        if auth.admin_username.is_empty() || auth.admin_password.is_empty() {
            tracing::warn!("operator credentials unset; /auth/login will reject all attempts");
        }
        Self {
            username: auth.admin_username.clone(),
            password: auth.admin_password.clone(),
        }
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn verify(&self, username: &str, password: &str) -> bool {
        !self.username.is_empty()
            && !self.password.is_empty()
            && username == self.username
            && password == self.password
    }
}
