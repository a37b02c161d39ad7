//! The adapter contract.

use async_trait::async_trait;
use lb_model::NormalizedProfile;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AuthError, AuthResult, MISSING_CREDENTIALS};

/// Username and password from a login form.
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    /// Username.
    #[serde(default)]
    pub username: String,
    /// Password.
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Rejects empty usernames or passwords.
    pub fn require(&self) -> AuthResult<()> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(AuthError::rejected(MISSING_CREDENTIALS));
        }
        Ok(())
    }
}

/// A configured provider's login logic.
///
/// Credential-based adapters implement [`ProviderAdapter::authenticate`];
/// redirect-based adapters implement [`ProviderAdapter::normalize`] for the
/// raw profile their external flow produced. Both return a profile whose
/// `provider_id` is the catalog id of the provider.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Catalog id of the provider.
    fn provider_id(&self) -> &str;

    /// Strategy name.
    fn strategy(&self) -> &'static str;

    /// Whether the adapter takes a username and password.
    fn credentials_necessary(&self) -> bool {
        false
    }

    /// Checks credentials.
    async fn authenticate(&self, credentials: &Credentials) -> AuthResult<NormalizedProfile> {
        let _ = credentials;
        Err(AuthError::Unsupported(self.provider_id().to_string()))
    }

    /// Normalizes a profile handed over by a redirect flow.
    fn normalize(&self, raw: &Value) -> AuthResult<NormalizedProfile> {
        let _ = raw;
        Err(AuthError::Unsupported(self.provider_id().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_password() {
        let credentials = Credentials::new("ada", "s3cret");
        let debug = format!("{credentials:?}");
        assert!(debug.contains("ada"));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn missing_fields_are_rejected() {
        assert!(Credentials::new("", "x").require().is_err());
        assert!(Credentials::new("ada", "").require().is_err());
        assert!(Credentials::new("ada", "x").require().is_ok());
    }
}
