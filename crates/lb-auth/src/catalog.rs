//! Provider catalog and application list files.

use std::collections::HashSet;
use std::path::Path;

use lb_model::{Application, ProviderConfig};
use serde_json::Value;

use crate::error::{AuthError, AuthResult};

fn catalog_error(path: &Path, e: impl std::fmt::Display) -> AuthError {
    AuthError::Catalog(format!("{}: {e}", path.display()))
}

/// Reads the catalog as raw JSON entries, creating an empty catalog when
/// the file is missing.
pub fn read_raw(path: &Path) -> AuthResult<Vec<Value>> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "provider catalog missing, creating an empty one");
        write_raw(path, &[])?;
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(path).map_err(|e| catalog_error(path, e))?;
    match serde_json::from_str(&text).map_err(|e| catalog_error(path, e))? {
        Value::Array(entries) => Ok(entries),
        _ => Err(catalog_error(path, "must contain a JSON array")),
    }
}

/// Writes raw catalog entries, pretty-printed.
pub fn write_raw(path: &Path, entries: &[Value]) -> AuthResult<()> {
    let text = serde_json::to_string_pretty(entries).map_err(|e| catalog_error(path, e))?;
    std::fs::write(path, text + "\n").map_err(|e| catalog_error(path, e))
}

/// Loads enabled providers and fills their derived fields.
///
/// Fails on malformed entries and duplicate ids.
pub fn load_providers(path: &Path, base_url: &str) -> AuthResult<Vec<ProviderConfig>> {
    let mut seen = HashSet::new();
    let mut providers = Vec::new();

    for (index, entry) in read_raw(path)?.into_iter().enumerate() {
        let mut provider: ProviderConfig = serde_json::from_value(entry)
            .map_err(|e| catalog_error(path, format!("entry {index}: {e}")))?;
        if provider.disabled {
            tracing::debug!(provider = %provider.id, "provider disabled");
            continue;
        }
        if !seen.insert(provider.id.clone()) {
            return Err(catalog_error(
                path,
                format!("duplicate provider id {}", provider.id),
            ));
        }
        provider.prepare(base_url);
        providers.push(provider);
    }

    tracing::info!(count = providers.len(), "provider catalog loaded");
    Ok(providers)
}

/// Loads the optional application list. A missing or unreadable file
/// yields an empty list.
#[must_use]
pub fn load_applications(path: &Path) -> Vec<Application> {
    let Ok(text) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    serde_json::from_str(&text).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "ignoring malformed application list");
        Vec::new()
    })
}
