//! Built-in adapters.

pub mod dev;
pub mod ldap;
pub mod local;
pub mod redirect;
pub mod script;

use lb_model::NormalizedProfile;
use serde::Deserialize;

use crate::error::{AuthError, AuthResult};

/// A user listed in the catalog entry of a `test` or `local` provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CatalogUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

impl CatalogUser {
    pub fn profile(&self, provider_id: &str) -> NormalizedProfile {
        NormalizedProfile {
            provider_id: provider_id.to_string(),
            id: self.id.clone().unwrap_or_else(|| self.username.clone()),
            name: self.display_name.clone(),
            username: Some(self.username.clone()),
            uri: self.uri.clone(),
        }
    }
}

#[derive(Deserialize)]
struct UserList {
    #[serde(default)]
    users: Vec<CatalogUser>,
}

/// Reads `options.users`.
pub(crate) fn catalog_users(
    provider_id: &str,
    options: &serde_json::Value,
) -> AuthResult<Vec<CatalogUser>> {
    if options.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value::<UserList>(options.clone())
        .map(|list| list.users)
        .map_err(|e| AuthError::invalid_options(provider_id, format!("options.users: {e}")))
}
