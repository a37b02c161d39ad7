//! Catalog users with argon2 password hashes.

use async_trait::async_trait;
use lb_model::{NormalizedProfile, ProviderConfig};

use super::{CatalogUser, catalog_users};
use crate::adapter::{Credentials, ProviderAdapter};
use crate::error::{AuthError, AuthResult};
use crate::password::PasswordHasherService;

/// `local` strategy.
#[derive(Debug)]
pub struct LocalAdapter {
    provider_id: String,
    users: Vec<CatalogUser>,
    hasher: PasswordHasherService,
}

impl LocalAdapter {
    /// Builds the adapter from `options.users`.
    pub fn from_config(config: &ProviderConfig) -> AuthResult<Self> {
        Ok(Self {
            provider_id: config.id.clone(),
            users: catalog_users(&config.id, &config.options)?,
            hasher: PasswordHasherService::default(),
        })
    }
}

#[async_trait]
impl ProviderAdapter for LocalAdapter {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn strategy(&self) -> &'static str {
        "local"
    }

    fn credentials_necessary(&self) -> bool {
        true
    }

    async fn authenticate(&self, credentials: &Credentials) -> AuthResult<NormalizedProfile> {
        credentials.require()?;
        let Some(user) = self
            .users
            .iter()
            .find(|u| u.username == credentials.username)
        else {
            return Err(AuthError::wrong_credentials());
        };

        let hasher = self.hasher.clone();
        let password = credentials.password.clone();
        let stored = user.password.clone();
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &stored))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        if matches {
            Ok(user.profile(&self.provider_id))
        } else {
            Err(AuthError::wrong_credentials())
        }
    }
}
