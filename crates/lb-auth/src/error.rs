//! Authentication error types.

use thiserror::Error;

/// Message for a login attempt without username or password.
pub const MISSING_CREDENTIALS: &str = "Missing credentials";

/// Message for a login attempt the provider refused.
pub const WRONG_CREDENTIALS: &str = "Wrong credentials";

/// Errors raised by provider adapters and catalog loading.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The provider refused the credentials. The message is shown to the
    /// user.
    #[error("{0}")]
    CredentialsRejected(String),

    /// A catalog entry names a strategy without an adapter.
    #[error("provider {provider}: unknown strategy {strategy}")]
    UnknownStrategy {
        /// Provider id.
        provider: String,
        /// Strategy named in the catalog.
        strategy: String,
    },

    /// A catalog entry has options the adapter cannot use.
    #[error("provider {provider}: {reason}")]
    InvalidOptions {
        /// Provider id.
        provider: String,
        /// What is wrong.
        reason: String,
    },

    /// No provider with this id is configured.
    #[error("unknown provider {0}")]
    UnknownProvider(String),

    /// The adapter does not support this kind of login.
    #[error("provider {0} does not accept this kind of login")]
    Unsupported(String),

    /// A redirect flow handed over a profile without the expected fields.
    #[error("invalid profile from {provider}: {reason}")]
    InvalidProfile {
        /// Provider id.
        provider: String,
        /// What is missing.
        reason: String,
    },

    /// The directory server could not be reached or answered with an error.
    #[error("directory error: {0}")]
    Directory(String),

    /// A catalog or application file could not be read or written.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Internal error.
    #[error("internal authentication error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Creates a rejection with the given user-facing reason.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::CredentialsRejected(reason.into())
    }

    /// Creates a rejection for wrong credentials.
    #[must_use]
    pub fn wrong_credentials() -> Self {
        Self::rejected(WRONG_CREDENTIALS)
    }

    /// Creates an options error for a provider.
    #[must_use]
    pub fn invalid_options(provider: &str, reason: impl Into<String>) -> Self {
        Self::InvalidOptions {
            provider: provider.to_string(),
            reason: reason.into(),
        }
    }

    /// Checks if the user's credentials were refused.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::CredentialsRejected(_))
    }
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

impl From<AuthError> for lb_core::Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::CredentialsRejected(reason) => Self::CredentialsRejected(reason),
            AuthError::UnknownProvider(id) => Self::NotFound(format!("Provider {id}")),
            AuthError::Unsupported(_) | AuthError::InvalidProfile { .. } => {
                Self::Validation(err.to_string())
            }
            AuthError::UnknownStrategy { .. }
            | AuthError::InvalidOptions { .. }
            | AuthError::Catalog(_) => Self::Config(err.to_string()),
            AuthError::Directory(_) | AuthError::Internal(_) => Self::Internal(err.to_string()),
        }
    }
}
