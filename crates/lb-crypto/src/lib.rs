//! # lb-crypto
//!
//! Cryptographic building blocks for login-broker, using aws-lc-rs.
//!
//! - RSA keypair generation, PEM encoding and on-disk management for the
//!   token signing keypair
//! - [`SessionCipher`]: RSA-OAEP encryption of session identifiers with a
//!   service-private keypair, so the raw id never appears inside a token
//! - Random identifiers for sessions and connections

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod algorithm;
pub mod cipher;
pub mod error;
pub mod keys;
pub mod pem;
pub mod random;

pub use algorithm::SignatureAlgorithm;
pub use cipher::SessionCipher;
pub use error::{CryptoError, CryptoResult};
pub use keys::{KeyPairPem, KeySource, load_or_generate_keypair};
