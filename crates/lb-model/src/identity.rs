//! Provider-scoped identities and the normalized profile adapters emit.

use serde::{Deserialize, Serialize};

/// An identity record stored on an account, keyed by provider id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Identifier at the provider.
    pub id: String,
    /// Display name at the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Username at the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Dereferenceable URI of the identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl Identity {
    /// Creates an identity with only an external id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            username: None,
            uri: None,
        }
    }
}

/// Profile record emitted by a provider adapter after a successful
/// authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedProfile {
    /// Provider that authenticated the user.
    pub provider_id: String,
    /// Identifier at the provider.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Username.
    #[serde(default)]
    pub username: Option<String>,
    /// Dereferenceable URI.
    #[serde(default)]
    pub uri: Option<String>,
}

impl NormalizedProfile {
    /// Creates a profile with the mandatory fields.
    #[must_use]
    pub fn new(provider_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            id: id.into(),
            name: None,
            username: None,
            uri: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the URI.
    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Returns the display name for a new account.
    ///
    /// Falls back to `username@provider`, or `id@provider` when the
    /// provider did not report a username either.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(name) => name.to_string(),
            None => format!(
                "{}@{}",
                self.username.as_deref().unwrap_or(&self.id),
                self.provider_id
            ),
        }
    }

    /// Returns the identity record stored on the account. The provider id
    /// becomes the map key and is not repeated in the record.
    #[must_use]
    pub fn to_identity(&self) -> Identity {
        Identity {
            id: self.id.clone(),
            name: self.name.clone(),
            username: self.username.clone(),
            uri: self.uri.clone(),
        }
    }
}
