//! Static strategy table and the configured adapters.

use std::collections::HashMap;
use std::sync::Arc;

use lb_model::{NormalizedProfile, ProviderConfig, ProviderInfo};

use crate::adapter::{Credentials, ProviderAdapter};
use crate::adapters::dev::TestAdapter;
use crate::adapters::ldap::LdapAdapter;
use crate::adapters::local::LocalAdapter;
use crate::adapters::redirect::{RedirectAdapter, RedirectKind};
use crate::adapters::script::ScriptAdapter;
use crate::error::{AuthError, AuthResult};
use crate::template;

fn build(config: &ProviderConfig) -> AuthResult<Arc<dyn ProviderAdapter>> {
    let adapter: Arc<dyn ProviderAdapter> = match config.strategy.as_str() {
        "test" => Arc::new(TestAdapter::from_config(config)?),
        "local" => Arc::new(LocalAdapter::from_config(config)?),
        "script" => Arc::new(ScriptAdapter::from_config(config)?),
        "ldap" | "ldapauth" => Arc::new(LdapAdapter::from_config(config)?),
        other => match RedirectKind::from_strategy(other) {
            Some(kind) => Arc::new(RedirectAdapter::new(config, kind)),
            None => {
                return Err(AuthError::UnknownStrategy {
                    provider: config.id.clone(),
                    strategy: other.to_string(),
                });
            }
        },
    };
    Ok(adapter)
}

/// Adapters for every enabled catalog entry, keyed by provider id.
pub struct AdapterRegistry {
    providers: Vec<ProviderConfig>,
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.providers.iter().map(|p| p.id.as_str()).collect();
        f.debug_struct("AdapterRegistry")
            .field("providers", &ids)
            .finish()
    }
}

impl AdapterRegistry {
    /// Builds an adapter for every entry. Fails on the first entry with an
    /// unknown strategy or unusable options.
    pub fn from_catalog(mut providers: Vec<ProviderConfig>) -> AuthResult<Self> {
        let mut adapters = HashMap::with_capacity(providers.len());
        for provider in &mut providers {
            let adapter = build(provider)?;
            provider.credentials_necessary |= adapter.credentials_necessary();
            tracing::debug!(provider = %provider.id, strategy = adapter.strategy(), "adapter configured");
            adapters.insert(provider.id.clone(), adapter);
        }
        Ok(Self {
            providers,
            adapters,
        })
    }

    /// Registry without providers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            providers: Vec::new(),
            adapters: HashMap::new(),
        }
    }

    /// Returns the catalog entry for a provider.
    #[must_use]
    pub fn provider(&self, id: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.id == id)
    }

    /// Returns the adapter for a provider.
    pub fn adapter(&self, id: &str) -> AuthResult<&Arc<dyn ProviderAdapter>> {
        self.adapters
            .get(id)
            .ok_or_else(|| AuthError::UnknownProvider(id.to_string()))
    }

    /// Returns the public projection of the catalog, in catalog order.
    #[must_use]
    pub fn public_catalog(&self) -> Vec<ProviderInfo> {
        self.providers.iter().map(ProviderConfig::public_info).collect()
    }

    /// Number of configured providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Runs a credential login and completes the profile URI.
    pub async fn authenticate(
        &self,
        provider_id: &str,
        credentials: &Credentials,
    ) -> AuthResult<NormalizedProfile> {
        let mut profile = self.adapter(provider_id)?.authenticate(credentials).await?;
        self.complete(provider_id, &mut profile);
        Ok(profile)
    }

    fn complete(&self, provider_id: &str, profile: &mut NormalizedProfile) {
        let template = self
            .provider(provider_id)
            .and_then(|p| p.template.as_deref());
        template::apply(template, profile);
    }
}
