//! Provider catalog entries.
//!
//! The catalog is loaded from a JSON array at startup. Each entry carries
//! private settings (`options`, `auth`, `template`) that must never leave the
//! server; [`ProviderInfo`] is the public projection sent to clients.

use serde::{Deserialize, Serialize};

/// A configured provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Provider id, unique within the catalog; used in routes and as the
    /// identity key on accounts.
    pub id: String,
    /// Adapter type (`github`, `local`, `ldap`, ...).
    pub strategy: String,
    /// Display name.
    pub name: String,
    /// Image URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Homepage of the provider.
    #[serde(default)]
    pub url: Option<String>,
    /// URI template filled from the profile to produce identity URIs.
    #[serde(default)]
    pub template: Option<String>,
    /// Whether the provider takes a username and password.
    #[serde(default)]
    pub credentials_necessary: bool,
    /// Disabled providers are dropped when the catalog is loaded.
    #[serde(default)]
    pub disabled: bool,
    /// Adapter-specific options.
    #[serde(default)]
    pub options: serde_json::Value,
    /// Client credentials for redirect-based providers.
    #[serde(default)]
    pub auth: serde_json::Value,
    /// Login route, filled by [`ProviderConfig::prepare`].
    #[serde(default, rename = "loginURL")]
    pub login_url: Option<String>,
}

/// Public projection of a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    /// Provider id.
    pub id: String,
    /// Adapter type.
    pub strategy: String,
    /// Display name.
    pub name: String,
    /// Image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Homepage of the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Login route.
    #[serde(rename = "loginURL")]
    pub login_url: String,
    /// Whether the provider takes a username and password.
    pub credentials_necessary: bool,
}

/// Returns the default homepage for well-known strategies.
#[must_use]
pub fn default_url_for(strategy: &str) -> Option<&'static str> {
    match strategy {
        "github" => Some("https://github.com"),
        "orcid" => Some("https://orcid.org"),
        "mediawiki" => Some("https://www.mediawiki.org/wiki/MediaWiki"),
        "stackexchange" => Some("https://stackexchange.com"),
        _ => None,
    }
}

impl ProviderConfig {
    /// Fills derived fields: login URL, default homepage and absolute image
    /// URL. `base_url` ends in `/`.
    pub fn prepare(&mut self, base_url: &str) {
        self.login_url = Some(format!("{base_url}login/{}", self.id));
        if self.url.is_none() {
            self.url = default_url_for(&self.strategy).map(String::from);
        }
        if let Some(image) = &self.image {
            if !image.starts_with("http") {
                self.image = Some(format!("{base_url}{}", image.trim_start_matches('/')));
            }
        }
    }

    /// Returns the public projection.
    #[must_use]
    pub fn public_info(&self) -> ProviderInfo {
        ProviderInfo {
            id: self.id.clone(),
            strategy: self.strategy.clone(),
            name: self.name.clone(),
            image: self.image.clone(),
            url: self.url.clone(),
            login_url: self.login_url.clone().unwrap_or_default(),
            credentials_necessary: self.credentials_necessary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ProviderConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn prepare_fills_derived_fields() {
        let mut provider = parse(
            r#"{"id": "gh", "strategy": "github", "name": "GitHub", "image": "static/gh.svg",
                "auth": {"clientID": "x", "clientSecret": "y"}}"#,
        );
        provider.prepare("https://login.example.org/");

        assert_eq!(
            provider.login_url.as_deref(),
            Some("https://login.example.org/login/gh")
        );
        assert_eq!(provider.url.as_deref(), Some("https://github.com"));
        assert_eq!(
            provider.image.as_deref(),
            Some("https://login.example.org/static/gh.svg")
        );
    }

    #[test]
    fn public_info_hides_secrets() {
        let mut provider = parse(
            r#"{"id": "local", "strategy": "local", "name": "Local", "credentialsNecessary": true,
                "template": "https://example.org/{username}",
                "options": {"users": [{"username": "a", "password": "$argon2id$..."}]}}"#,
        );
        provider.prepare("http://localhost:3004/");

        let json = serde_json::to_value(provider.public_info()).unwrap();
        assert_eq!(json["loginURL"], "http://localhost:3004/login/local");
        assert_eq!(json["credentialsNecessary"], true);
        assert!(json.get("options").is_none());
        assert!(json.get("template").is_none());
        assert!(json.get("auth").is_none());
    }
}
