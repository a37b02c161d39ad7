//! Error taxonomy for login-broker.
//!
//! Lower crates keep their own error enums and convert into [`Error`] at the
//! coordinator boundary. The variants here are the ones callers are expected
//! to branch on: credentials rejected, merge conflicts, store outages, token
//! failures and a missing session.

use thiserror::Error;

/// Result type alias using the broker error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Generic message shown to users while a backing store is unreachable.
pub const RETRY_LATER_MESSAGE: &str = "Service temporarily unavailable, please try again later.";

/// Message sent on a connection when a presented token cannot be used.
pub const AUTHENTICATION_FAILED_MESSAGE: &str = "Authentication failed.";

/// Main error type for broker operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A provider adapter refused the presented credentials.
    #[error("credentials rejected: {0}")]
    CredentialsRejected(String),

    /// Two accounts share providers and cannot be merged automatically.
    #[error("merge conflict on providers: {}", providers.join(", "))]
    MergeConflict {
        /// Provider ids present on both accounts.
        providers: Vec<String>,
    },

    /// The account or session store could not be reached.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A token failed signature, expiry or claim validation.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Authentication over an established connection failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// No live session exists for the presented id.
    #[error("session not found")]
    SessionNotFound,

    /// Resource not found.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The caller may not act on the resource.
    #[error("access denied: {0}")]
    Forbidden(String),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Cryptographic error.
    #[error("cryptographic error: {0}")]
    Crypto(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Creates a merge conflict error from any iterable of provider ids.
    #[must_use]
    pub fn merge_conflict<I, S>(providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MergeConflict {
            providers: providers.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::Config(_) | Self::Crypto(_) | Self::Internal(_)
        )
    }

    /// Returns whether this error represents a client error.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns whether the failure was caused by a store outage.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    /// Renders the message shown to end users.
    ///
    /// Infrastructure failures collapse to a generic retry-later message so
    /// that no internal detail leaks into pages or API responses.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::CredentialsRejected(reason) => reason.clone(),
            Self::MergeConflict { providers } => format!(
                "Both accounts have an identity for {}. Disconnect {} from one of the accounts before merging.",
                providers.join(", "),
                if providers.len() == 1 { "it" } else { "them" }
            ),
            Self::StoreUnavailable(_) => RETRY_LATER_MESSAGE.to_string(),
            Self::InvalidToken(_) | Self::AuthenticationFailed => {
                AUTHENTICATION_FAILED_MESSAGE.to_string()
            }
            Self::SessionNotFound => "Session not found.".to_string(),
            Self::NotFound(what) => format!("{what} not found."),
            Self::Forbidden(reason) | Self::Validation(reason) => reason.clone(),
            Self::Config(_) | Self::Crypto(_) | Self::Internal(_) => {
                "An internal error occurred.".to_string()
            }
        }
    }
}
