//! Directory login.
//!
//! Binds with the service account, searches the user with the configured
//! filter, then binds as the found entry with the presented password. Each
//! login uses a fresh connection that is unbound afterwards.

use std::time::Duration;

use async_trait::async_trait;
use lb_model::{NormalizedProfile, ProviderConfig};
use ldap3::{LdapConnAsync, LdapConnSettings, Scope, SearchEntry, ldap_escape};
use serde::Deserialize;

use crate::adapter::{Credentials, ProviderAdapter};
use crate::error::{AuthError, AuthResult};

/// Placeholder in the search filter replaced by the escaped username.
pub const USERNAME_PLACEHOLDER: &str = "{{username}}";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Directory settings from the catalog entry.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LdapOptions {
    /// `ldap://` or `ldaps://` URL.
    pub url: String,
    /// Service account DN. Anonymous search when absent.
    #[serde(default, rename = "bindDN")]
    pub bind_dn: Option<String>,
    /// Service account password.
    #[serde(default)]
    pub bind_credentials: Option<String>,
    /// Search base.
    pub search_base: String,
    /// Search filter containing `{{username}}`.
    pub search_filter: String,
}

impl std::fmt::Debug for LdapOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapOptions")
            .field("url", &self.url)
            .field("bind_dn", &self.bind_dn)
            .field("bind_credentials", &"[REDACTED]")
            .field("search_base", &self.search_base)
            .field("search_filter", &self.search_filter)
            .finish()
    }
}

impl LdapOptions {
    /// Returns the search filter for a username.
    #[must_use]
    pub fn filter_for(&self, username: &str) -> String {
        self.search_filter
            .replace(USERNAME_PLACEHOLDER, &ldap_escape(username))
    }
}

/// `ldap` strategy.
#[derive(Debug)]
pub struct LdapAdapter {
    provider_id: String,
    options: LdapOptions,
}

fn directory_error(e: impl std::fmt::Display) -> AuthError {
    AuthError::Directory(e.to_string())
}

fn first_attr(entry: &SearchEntry, name: &str) -> Option<String> {
    entry
        .attrs
        .get(name)
        .and_then(|values| values.first())
        .cloned()
}

impl LdapAdapter {
    /// Builds the adapter; `url`, `searchBase` and `searchFilter` are
    /// required.
    pub fn from_config(config: &ProviderConfig) -> AuthResult<Self> {
        let options: LdapOptions = serde_json::from_value(config.options.clone())
            .map_err(|e| AuthError::invalid_options(&config.id, format!("ldap options: {e}")))?;
        if !options.url.starts_with("ldap://") && !options.url.starts_with("ldaps://") {
            return Err(AuthError::invalid_options(
                &config.id,
                "options.url must be an ldap:// or ldaps:// URL",
            ));
        }
        if !options.search_filter.contains(USERNAME_PLACEHOLDER) {
            return Err(AuthError::invalid_options(
                &config.id,
                "options.searchFilter must contain {{username}}",
            ));
        }
        Ok(Self {
            provider_id: config.id.clone(),
            options,
        })
    }

    async fn login(&self, credentials: &Credentials) -> AuthResult<NormalizedProfile> {
        let settings = LdapConnSettings::new().set_conn_timeout(CONNECT_TIMEOUT);
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.options.url)
            .await
            .map_err(directory_error)?;
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::warn!(error = %e, "ldap connection driver error");
            }
        });

        if let Some(bind_dn) = &self.options.bind_dn {
            ldap.simple_bind(bind_dn, self.options.bind_credentials.as_deref().unwrap_or(""))
                .await
                .map_err(directory_error)?
                .success()
                .map_err(directory_error)?;
        }

        let (entries, _) = ldap
            .search(
                &self.options.search_base,
                Scope::Subtree,
                &self.options.filter_for(&credentials.username),
                vec!["uid", "cn"],
            )
            .await
            .map_err(directory_error)?
            .success()
            .map_err(directory_error)?;

        let Some(entry) = entries.into_iter().next().map(SearchEntry::construct) else {
            let _ = ldap.unbind().await;
            return Err(AuthError::wrong_credentials());
        };

        let bound = ldap
            .simple_bind(&entry.dn, &credentials.password)
            .await
            .map_err(directory_error)?
            .success();
        let _ = ldap.unbind().await;
        if bound.is_err() {
            return Err(AuthError::wrong_credentials());
        }

        let uid = first_attr(&entry, "uid").unwrap_or_else(|| credentials.username.clone());
        Ok(NormalizedProfile {
            provider_id: self.provider_id.clone(),
            id: uid.clone(),
            name: first_attr(&entry, "cn"),
            username: Some(uid),
            uri: None,
        })
    }
}

#[async_trait]
impl ProviderAdapter for LdapAdapter {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn strategy(&self) -> &'static str {
        "ldap"
    }

    fn credentials_necessary(&self) -> bool {
        true
    }

    async fn authenticate(&self, credentials: &Credentials) -> AuthResult<NormalizedProfile> {
        // An empty password would be an unauthenticated bind, which most
        // servers accept.
        credentials.require()?;
        self.login(credentials).await.inspect_err(|err| {
            if !err.is_rejected() {
                tracing::error!(provider = %self.provider_id, error = %err, "ldap login failed");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(options: serde_json::Value) -> ProviderConfig {
        serde_json::from_value(serde_json::json!({
            "id": "ldap", "strategy": "ldap", "name": "Directory", "options": options
        }))
        .unwrap()
    }

    fn valid() -> serde_json::Value {
        serde_json::json!({
            "url": "ldaps://ldap.example.org",
            "bindDN": "cn=service,dc=example,dc=org",
            "bindCredentials": "secret",
            "searchBase": "ou=people,dc=example,dc=org",
            "searchFilter": "(uid={{username}})"
        })
    }

    #[test]
    fn filter_escapes_username() {
        let adapter = LdapAdapter::from_config(&config(valid())).unwrap();
        assert_eq!(adapter.options.filter_for("ada"), "(uid=ada)");
        assert_eq!(adapter.options.filter_for("a*)(uid=*"), "(uid=a\\2a\\29\\28uid=\\2a)");
    }

    #[test]
    fn debug_hides_bind_credentials() {
        let adapter = LdapAdapter::from_config(&config(valid())).unwrap();
        assert!(!format!("{adapter:?}").contains("secret"));
    }

    #[test]
    fn rejects_bad_options() {
        let mut no_placeholder = valid();
        no_placeholder["searchFilter"] = serde_json::json!("(uid=*)");
        assert!(LdapAdapter::from_config(&config(no_placeholder)).is_err());

        let mut bad_url = valid();
        bad_url["url"] = serde_json::json!("http://ldap.example.org");
        assert!(LdapAdapter::from_config(&config(bad_url)).is_err());

        assert!(LdapAdapter::from_config(&config(serde_json::json!({}))).is_err());
    }

    #[tokio::test]
    async fn empty_password_never_reaches_directory() {
        let adapter = LdapAdapter::from_config(&config(valid())).unwrap();
        let err = adapter
            .authenticate(&Credentials::new("ada", ""))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing credentials");
    }
}
