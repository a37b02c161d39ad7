//! CLI error types.

use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// The provider catalog could not be read or written.
    #[error("catalog error: {0}")]
    Catalog(#[from] lb_auth::AuthError),

    /// Provider or user not found.
    #[error("{resource_type} not found: {id}")]
    NotFound {
        /// Type of resource.
        resource_type: &'static str,
        /// Resource identifier.
        id: String,
    },

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] lb_storage::StorageError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Creates a not found error.
    #[must_use]
    pub fn not_found(resource_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;
