//! Token error types.

use lb_crypto::CryptoError;
use thiserror::Error;

/// Errors that can occur while issuing or verifying tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Key material could not be loaded.
    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    /// Signing failed.
    #[error("Token signing failed: {0}")]
    Signing(String),

    /// The token failed signature, format or expiry checks.
    #[error("Invalid token: {0}")]
    Invalid(String),

    /// The session claim could not be decrypted.
    #[error("Invalid session claim")]
    InvalidSessionClaim,

    /// Cryptographic failure outside token handling.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl TokenError {
    /// Checks if the failure is attributable to the presented token.
    #[must_use]
    pub const fn is_invalid_token(&self) -> bool {
        matches!(self, Self::Invalid(_) | Self::InvalidSessionClaim)
    }
}

/// Result type for token operations.
pub type TokenResult<T> = Result<T, TokenError>;

impl From<TokenError> for lb_core::Error {
    fn from(err: TokenError) -> Self {
        if err.is_invalid_token() {
            Self::InvalidToken(err.to_string())
        } else {
            Self::Crypto(err.to_string())
        }
    }
}
