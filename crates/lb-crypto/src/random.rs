//! Random identifiers.
//!
//! All functions use the thread-local generator, which is cryptographically
//! secure.

use rand::distr::{Alphanumeric, SampleString};

/// Length of generated session identifiers.
pub const SESSION_ID_LEN: usize = 32;

/// Generates a random alphanumeric string of `len` characters.
#[must_use]
pub fn random_alphanumeric(len: usize) -> String {
    let mut rng = rand::rng();
    Alphanumeric.sample_string(&mut rng, len)
}

/// Generates a session identifier (about 190 bits of entropy).
#[must_use]
pub fn session_id() -> String {
    random_alphanumeric(SESSION_ID_LEN)
}
