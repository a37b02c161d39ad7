//! Redirect-based providers.
//!
//! The redirect negotiation itself happens outside the broker. These
//! adapters only map the raw profile that flow hands over onto a
//! [`NormalizedProfile`].

use async_trait::async_trait;
use lb_model::{NormalizedProfile, ProviderConfig};
use serde_json::Value;

use crate::adapter::ProviderAdapter;
use crate::error::{AuthError, AuthResult};

/// Known redirect strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// GitHub OAuth.
    Github,
    /// ORCID OAuth; the profile is in the token response.
    Orcid,
    /// `MediaWiki` OAuth.
    Mediawiki,
    /// Stack Exchange OAuth.
    Stackexchange,
    /// easydb.
    Easydb,
    /// CBS.
    Cbs,
}

impl RedirectKind {
    /// Parses a strategy name.
    #[must_use]
    pub fn from_strategy(strategy: &str) -> Option<Self> {
        match strategy {
            "github" => Some(Self::Github),
            "orcid" => Some(Self::Orcid),
            "mediawiki" => Some(Self::Mediawiki),
            "stackexchange" => Some(Self::Stackexchange),
            "easydb" => Some(Self::Easydb),
            "cbs" => Some(Self::Cbs),
            _ => None,
        }
    }

    /// Returns the strategy name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Orcid => "orcid",
            Self::Mediawiki => "mediawiki",
            Self::Stackexchange => "stackexchange",
            Self::Easydb => "easydb",
            Self::Cbs => "cbs",
        }
    }

    /// JSON pointers of `(id, name, username)` in the raw profile.
    const fn pointers(self) -> (&'static str, &'static str, Option<&'static str>) {
        match self {
            Self::Github | Self::Stackexchange | Self::Easydb => {
                ("/id", "/displayName", Some("/username"))
            }
            Self::Orcid => ("/orcid", "/name", None),
            Self::Mediawiki => ("/id", "/displayName", Some("/_json/username")),
            Self::Cbs => ("/data/userKey", "/data/name", None),
        }
    }
}

fn text(raw: &Value, pointer: &str) -> Option<String> {
    match raw.pointer(pointer)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Normalizer for one redirect provider.
#[derive(Debug)]
pub struct RedirectAdapter {
    provider_id: String,
    kind: RedirectKind,
}

impl RedirectAdapter {
    /// Builds the adapter.
    #[must_use]
    pub fn new(config: &ProviderConfig, kind: RedirectKind) -> Self {
        if config.auth.is_null() {
            tracing::warn!(provider = %config.id, "redirect provider has no auth settings");
        }
        Self {
            provider_id: config.id.clone(),
            kind,
        }
    }
}

#[async_trait]
impl ProviderAdapter for RedirectAdapter {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn strategy(&self) -> &'static str {
        self.kind.as_str()
    }

    fn normalize(&self, raw: &Value) -> AuthResult<NormalizedProfile> {
        let (id, name, username) = self.kind.pointers();
        let id = text(raw, id).ok_or_else(|| AuthError::InvalidProfile {
            provider: self.provider_id.clone(),
            reason: format!("missing {}", id.trim_start_matches('/')),
        })?;

        Ok(NormalizedProfile {
            provider_id: self.provider_id.clone(),
            id,
            name: text(raw, name),
            username: username.and_then(|pointer| text(raw, pointer)),
            uri: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn adapter(strategy: &str) -> RedirectAdapter {
        let config: ProviderConfig = serde_json::from_value(json!({
            "id": strategy, "strategy": strategy, "name": strategy,
            "auth": {"clientID": "x", "clientSecret": "y"}
        }))
        .unwrap();
        RedirectAdapter::new(&config, RedirectKind::from_strategy(strategy).unwrap())
    }

    #[test]
    fn github_numeric_id() {
        let profile = adapter("github")
            .normalize(&json!({"id": 42, "displayName": "Ada", "username": "ada"}))
            .unwrap();
        assert_eq!(profile.id, "42");
        assert_eq!(profile.name.as_deref(), Some("Ada"));
        assert_eq!(profile.username.as_deref(), Some("ada"));
    }

    #[test]
    fn orcid_has_no_username() {
        let profile = adapter("orcid")
            .normalize(&json!({"orcid": "0000-0001", "name": "Ada"}))
            .unwrap();
        assert_eq!(profile.id, "0000-0001");
        assert_eq!(profile.username, None);
    }

    #[test]
    fn nested_fields() {
        let profile = adapter("mediawiki")
            .normalize(&json!({"id": "7", "displayName": "Ada", "_json": {"username": "Ada L"}}))
            .unwrap();
        assert_eq!(profile.username.as_deref(), Some("Ada L"));

        let profile = adapter("cbs")
            .normalize(&json!({"data": {"userKey": "k1", "name": "Ada"}}))
            .unwrap();
        assert_eq!(profile.id, "k1");
    }

    #[test]
    fn missing_id_is_invalid() {
        let err = adapter("github")
            .normalize(&json!({"displayName": "Ada"}))
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidProfile { .. }));
    }
}
