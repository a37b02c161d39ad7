//! Account domain model.
//!
//! An account is the internal user record. It owns a map from provider id to
//! [`Identity`] and remembers the URIs of accounts merged into it so that
//! lookups of those URIs can be redirected.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::{Identity, NormalizedProfile};

/// An internal account aggregating one or more external identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Unique identifier.
    pub id: String,
    /// Canonical URI, derived from the id.
    pub uri: String,
    /// Display name.
    pub name: String,
    /// Identities keyed by provider id.
    #[serde(default)]
    pub identities: BTreeMap<String, Identity>,
    /// URIs of accounts absorbed into this one, oldest first.
    #[serde(default)]
    pub merged_from: Vec<String>,
}

/// Account view without identities, as embedded in tokens and events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    /// Unique identifier.
    pub id: String,
    /// Canonical URI.
    pub uri: String,
    /// Display name.
    pub name: String,
    /// URIs of accounts absorbed into this one.
    #[serde(default)]
    pub merged_from: Vec<String>,
}

impl Account {
    /// Builds the canonical URI for an account id. `base_url` ends in `/`.
    #[must_use]
    pub fn uri_for(base_url: &str, id: &str) -> String {
        format!("{base_url}users/{id}")
    }

    /// Creates a new account holding a single identity from `profile`.
    #[must_use]
    pub fn from_profile(base_url: &str, profile: &NormalizedProfile) -> Self {
        let id = Uuid::new_v4().to_string();
        let mut identities = BTreeMap::new();
        identities.insert(profile.provider_id.clone(), profile.to_identity());
        Self {
            uri: Self::uri_for(base_url, &id),
            id,
            name: profile.display_name(),
            identities,
            merged_from: Vec::new(),
        }
    }

    /// Returns the identity for a provider.
    #[must_use]
    pub fn identity(&self, provider_id: &str) -> Option<&Identity> {
        self.identities.get(provider_id)
    }

    /// Returns whether this account holds the given external identity.
    #[must_use]
    pub fn owns(&self, provider_id: &str, external_id: &str) -> bool {
        self.identity(provider_id)
            .is_some_and(|identity| identity.id == external_id)
    }

    /// Returns whether `uri` names this account: its own URI, the URI of
    /// one of its identities, or the URI of an account it absorbed.
    #[must_use]
    pub fn answers_to(&self, uri: &str) -> bool {
        self.uri == uri
            || self.merged_from.iter().any(|merged| merged == uri)
            || self
                .identities
                .values()
                .any(|identity| identity.uri.as_deref() == Some(uri))
    }

    /// Iterates over `(provider id, external id)` pairs.
    pub fn identity_keys(&self) -> impl Iterator<Item = (&str, &str)> {
        self.identities
            .iter()
            .map(|(provider, identity)| (provider.as_str(), identity.id.as_str()))
    }

    /// Returns the provider ids present on both accounts, sorted.
    #[must_use]
    pub fn shared_providers(&self, other: &Self) -> Vec<String> {
        self.identities
            .keys()
            .filter(|provider| other.identities.contains_key(*provider))
            .cloned()
            .collect()
    }

    /// Absorbs `other` into this account.
    ///
    /// Fails with the overlapping provider ids, leaving `self` untouched,
    /// when both accounts share a provider. On success the absorbed URI and
    /// its own merge history are appended to `merged_from`.
    pub fn absorb(&mut self, other: Self) -> Result<(), Vec<String>> {
        let shared = self.shared_providers(&other);
        if !shared.is_empty() {
            return Err(shared);
        }
        self.identities.extend(other.identities);
        for uri in other.merged_from {
            if !self.merged_from.contains(&uri) {
                self.merged_from.push(uri);
            }
        }
        if !self.merged_from.contains(&other.uri) {
            self.merged_from.push(other.uri);
        }
        Ok(())
    }

    /// Returns the view without identities.
    #[must_use]
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id.clone(),
            uri: self.uri.clone(),
            name: self.name.clone(),
            merged_from: self.merged_from.clone(),
        }
    }
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        account.summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost:3004/";

    fn account_with(providers: &[(&str, &str)]) -> Account {
        let (first, rest) = providers.split_first().unwrap();
        let mut account = Account::from_profile(BASE, &NormalizedProfile::new(first.0, first.1));
        for (provider, id) in rest {
            account
                .identities
                .insert((*provider).to_string(), Identity::new(*id));
        }
        account
    }

    #[test]
    fn new_account_uri_derives_from_id() {
        let profile = NormalizedProfile::new("github", "42").with_name("Ada");
        let account = Account::from_profile(BASE, &profile);
        assert_eq!(account.uri, format!("{BASE}users/{}", account.id));
        assert_eq!(account.name, "Ada");
        assert!(account.owns("github", "42"));
        assert!(!account.owns("github", "43"));
        assert!(account.merged_from.is_empty());
    }

    #[test]
    fn absorb_disjoint_accounts() {
        let mut a = account_with(&[("github", "1")]);
        let b = account_with(&[("orcid", "2")]);
        let b_uri = b.uri.clone();

        a.absorb(b).unwrap();

        assert_eq!(
            a.identities.keys().cloned().collect::<Vec<_>>(),
            vec!["github".to_string(), "orcid".to_string()]
        );
        assert_eq!(a.merged_from, vec![b_uri]);
    }

    #[test]
    fn absorb_carries_merge_history() {
        let mut a = account_with(&[("github", "1")]);
        let mut b = account_with(&[("orcid", "2")]);
        b.merged_from.push(format!("{BASE}users/older"));
        let b_uri = b.uri.clone();

        a.absorb(b).unwrap();

        assert_eq!(a.merged_from, vec![format!("{BASE}users/older"), b_uri]);
    }

    #[test]
    fn absorb_refuses_overlap() {
        let mut a = account_with(&[("github", "1"), ("orcid", "9")]);
        let before = a.clone();
        let b = account_with(&[("github", "2"), ("ldap", "x")]);

        let shared = a.absorb(b).unwrap_err();

        assert_eq!(shared, vec!["github".to_string()]);
        assert_eq!(a, before);
    }

    #[test]
    fn summary_omits_identities() {
        let account = account_with(&[("github", "1")]);
        let json = serde_json::to_value(account.summary()).unwrap();
        assert!(json.get("identities").is_none());
        assert_eq!(json["id"], account.id);
        assert!(json.get("mergedFrom").is_some());
    }
}
