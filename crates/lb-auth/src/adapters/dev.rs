//! Development provider with plain-text passwords from the catalog.

use async_trait::async_trait;
use lb_model::{NormalizedProfile, ProviderConfig};

use super::{CatalogUser, catalog_users};
use crate::adapter::{Credentials, ProviderAdapter};
use crate::error::{AuthError, AuthResult};

/// `test` strategy.
#[derive(Debug)]
pub struct TestAdapter {
    provider_id: String,
    users: Vec<CatalogUser>,
}

impl TestAdapter {
    /// Builds the adapter; at least one user is required.
    pub fn from_config(config: &ProviderConfig) -> AuthResult<Self> {
        let users = catalog_users(&config.id, &config.options)?;
        if users.is_empty() {
            return Err(AuthError::invalid_options(
                &config.id,
                "test provider needs at least one user in options.users",
            ));
        }
        tracing::warn!(provider = %config.id, "test provider enabled, passwords are compared in plain text");
        Ok(Self {
            provider_id: config.id.clone(),
            users,
        })
    }
}

#[async_trait]
impl ProviderAdapter for TestAdapter {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn strategy(&self) -> &'static str {
        "test"
    }

    fn credentials_necessary(&self) -> bool {
        true
    }

    async fn authenticate(&self, credentials: &Credentials) -> AuthResult<NormalizedProfile> {
        credentials.require()?;
        self.users
            .iter()
            .find(|u| u.username == credentials.username && u.password == credentials.password)
            .map(|u| u.profile(&self.provider_id))
            .ok_or_else(AuthError::wrong_credentials)
    }
}
