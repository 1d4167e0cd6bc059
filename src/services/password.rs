//! Argon2id password hashing and verification.
//!
//! DESIGN
//! ======
//! The work factor is the Argon2 iteration count (`t_cost`). It is fixed when
//! the hasher is built at startup; hashes are stored as PHC strings, so each
//! one carries the parameters it was produced with and keeps verifying after
//! the configured cost changes.
//!
//! Verification compares digests with the constant-time comparison inside
//! `password-hash`, so timing depends on the stored parameters, never on how
//! much of the plaintext matched.
//!
//! Both operations are CPU-bound for roughly 100ms at the default cost, so
//! the async wrappers move them onto the blocking pool.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

/// Memory cost in KiB (the Argon2 crate default, 19 MiB).
pub const DEFAULT_MEMORY_KIB: u32 = 19_456;

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("invalid hash parameters: {0}")]
    Params(String),
    #[error("hashing failed: {0}")]
    Hash(String),
    #[error("malformed stored hash: {0}")]
    Malformed(String),
    #[error("hashing task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Build a hasher with the default memory cost and the given iteration count.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Params`] if `cost` is zero.
    pub fn new(cost: u32) -> Result<Self, HashError> {
        Self::with_memory(DEFAULT_MEMORY_KIB, cost)
    }

    /// # Errors
    ///
    /// Returns [`HashError::Params`] if the parameters are outside Argon2's limits.
    pub fn with_memory(memory_kib: u32, cost: u32) -> Result<Self, HashError> {
        let params = Params::new(memory_kib, cost, 1, None).map_err(|e| HashError::Params(e.to_string()))?;
        Ok(Self { params })
    }

    #[must_use]
    pub fn cost(&self) -> u32 {
        self.params.t_cost()
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext with a fresh random salt. Returns a PHC-format string.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Hash`] if Argon2 rejects the input.
    pub fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| HashError::Hash(e.to_string()))
    }

    /// Check a plaintext against a stored PHC hash.
    ///
    /// Returns `Ok(false)` on mismatch.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Malformed`] if the stored hash cannot be parsed or
    /// verified for a reason other than a mismatch.
    pub fn verify(&self, plaintext: &str, stored: &str) -> Result<bool, HashError> {
        let parsed = PasswordHash::new(stored).map_err(|e| HashError::Malformed(e.to_string()))?;
        // Parameters come from the stored hash, not from `self.params`.
        match self.argon2().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(HashError::Malformed(e.to_string())),
        }
    }

    /// [`Self::hash`] on the blocking pool.
    ///
    /// # Errors
    ///
    /// As [`Self::hash`], plus [`HashError::Task`] if the worker panicked.
    pub async fn hash_blocking(&self, plaintext: &str) -> Result<String, HashError> {
        let hasher = self.clone();
        let plaintext = plaintext.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| HashError::Task(e.to_string()))?
    }

    /// [`Self::verify`] on the blocking pool.
    ///
    /// # Errors
    ///
    /// As [`Self::verify`], plus [`HashError::Task`] if the worker panicked.
    pub async fn verify_blocking(&self, plaintext: &str, stored: &str) -> Result<bool, HashError> {
        let hasher = self.clone();
        let plaintext = plaintext.to_owned();
        let stored = stored.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &stored))
            .await
            .map_err(|e| HashError::Task(e.to_string()))?
    }
}

#[cfg(test)]
#[path = "password_test.rs"]
mod tests;
