//! Storage error types.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Entity not found.
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        /// Type of entity (e.g., "Account").
        entity_type: &'static str,
        /// Entity ID.
        id: String,
    },

    /// A unique key is already taken.
    #[error("Duplicate {entity_type}: {field} '{value}' already exists")]
    Duplicate {
        /// Type of entity.
        entity_type: &'static str,
        /// Field that caused the conflict.
        field: &'static str,
        /// Conflicting value.
        value: String,
    },

    /// A write was refused because it would break an invariant.
    #[error("Conflicting write: {0}")]
    Conflict(String),

    /// Invalid data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Query failed for a reason other than connectivity.
    #[error("Database query error: {0}")]
    Query(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error.
    #[error("Internal storage error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Creates a not found error for an entity.
    #[must_use]
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a duplicate error.
    #[must_use]
    pub fn duplicate(
        entity_type: &'static str,
        field: &'static str,
        value: impl Into<String>,
    ) -> Self {
        Self::Duplicate {
            entity_type,
            field,
            value: value.into(),
        }
    }

    /// Creates the duplicate error for an identity owned by another account.
    #[must_use]
    pub fn identity_taken(provider_id: &str, external_id: &str) -> Self {
        Self::duplicate("Identity", "provider/external id", format!("{provider_id}/{external_id}"))
    }

    /// Checks if this is a not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Checks if this is a duplicate error.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// Checks if the store was unreachable.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for lb_core::Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity_type, .. } => Self::NotFound(entity_type.to_string()),
            StorageError::Duplicate { .. }
            | StorageError::Conflict(_)
            | StorageError::InvalidData(_) => Self::Validation(err.to_string()),
            StorageError::Unavailable(msg) => Self::StoreUnavailable(msg),
            StorageError::Query(_) | StorageError::Serialization(_) | StorageError::Internal(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_error() {
        let err = StorageError::not_found("Account", "7f1c");

        assert!(err.is_not_found());
        assert!(!err.is_duplicate());
        assert!(err.to_string().contains("Account"));
    }

    #[test]
    fn identity_taken_is_duplicate() {
        let err = StorageError::identity_taken("github", "42");

        assert!(err.is_duplicate());
        assert!(err.to_string().contains("github/42"));
    }

    #[test]
    fn unavailable_maps_to_store_unavailable() {
        let err: lb_core::Error = StorageError::Unavailable("pool timed out".into()).into();
        assert!(err.is_unavailable());
    }
}
