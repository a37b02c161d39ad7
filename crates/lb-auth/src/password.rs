//! Password hashing for local provider users.
//!
//! Hashes are Argon2id PHC strings stored in the provider catalog. The
//! operator CLI writes them; the `local` adapter verifies them.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::{AuthError, AuthResult};

/// Argon2 cost parameters.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    /// Time cost (iterations).
    pub time_cost: u32,
    /// Parallelism factor.
    pub parallelism: u32,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            memory_cost: 19 * 1024,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl PasswordPolicy {
    /// Sets the memory cost in KiB.
    #[must_use]
    pub const fn memory_cost(mut self, kib: u32) -> Self {
        self.memory_cost = kib;
        self
    }

    /// Sets the time cost.
    #[must_use]
    pub const fn time_cost(mut self, iterations: u32) -> Self {
        self.time_cost = iterations;
        self
    }

    fn build_params(&self) -> Result<Params, argon2::Error> {
        Params::new(self.memory_cost, self.time_cost, self.parallelism, None)
    }
}

/// Argon2id hasher.
#[derive(Debug, Clone, Default)]
pub struct PasswordHasherService {
    policy: PasswordPolicy,
}

impl PasswordHasherService {
    /// Creates a hasher with the given policy.
    #[must_use]
    pub const fn new(policy: PasswordPolicy) -> Self {
        Self { policy }
    }

    /// Hashes a password into a PHC string.
    pub fn hash(&self, password: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let params = self
            .policy
            .build_params()
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// Checks a password against a stored hash.
    ///
    /// A malformed stored hash never matches.
    #[must_use]
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            tracing::warn!("stored password hash is not a PHC string");
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}
