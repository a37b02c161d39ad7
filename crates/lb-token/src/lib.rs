//! # lb-token
//!
//! Token codec for login-broker.
//!
//! Tokens are RS256/384/512 JWTs carrying the account without its
//! identities. When the caller's session is live, its id is added as a
//! claim, encrypted with a key that never leaves the service: the signing
//! key's public half is published, so anything else in the token is
//! readable by every holder.
//!
//! There is no revocation list. Deleting a session only stops future
//! tokens from carrying it; issued tokens stay valid until they expire.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod claims;
pub mod codec;
pub mod error;

pub use claims::TokenClaims;
pub use codec::{IssuedToken, SigningKey, TokenCodec};
pub use error::{TokenError, TokenResult};
