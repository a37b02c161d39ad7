//! Crypto error types.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key generation failed.
    #[error("key generation failed")]
    KeyGeneration,

    /// Key material could not be parsed.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Encryption failed.
    #[error("encryption failed")]
    Encryption,

    /// Ciphertext could not be decrypted.
    #[error("decryption failed")]
    Decryption,

    /// Unknown or unsupported algorithm.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Key file could not be read or written.
    #[error("key file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

impl From<CryptoError> for lb_core::Error {
    fn from(err: CryptoError) -> Self {
        Self::Crypto(err.to_string())
    }
}
