//! Salted slow hashing for long-term secrets.
//!
//! Hashes are PHC strings carrying algorithm, version, parameters, and a
//! per-secret random salt, so stored hashes outlive work-factor changes:
//! verification reads the parameters back from the stored string.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretError {
    /// The plaintext cannot be hashed. Only raised for unusable input;
    /// verification failures are reported as a plain `false` instead.
    #[error("secret must not be empty")]
    EmptyPlaintext,
    #[error("invalid hashing parameters")]
    InvalidParams,
    #[error("failed to hash secret")]
    Hashing,
}

/// Argon2id hasher with a tunable work factor.
#[derive(Clone)]
pub struct SecretStore {
    argon2: Argon2<'static>,
}

impl std::fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStore").finish_non_exhaustive()
    }
}

impl Default for SecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore {
    /// Default work factor, suitable for interactive logins.
    #[must_use]
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Custom work factor. Raising the cost only affects new hashes;
    /// existing ones keep verifying with the parameters they were created
    /// with.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::InvalidParams`] when the cost parameters are
    /// out of range.
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, SecretError> {
        let params =
            Params::new(m_cost, t_cost, p_cost, None).map_err(|_| SecretError::InvalidParams)?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext secret with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::EmptyPlaintext`] for empty input and
    /// [`SecretError::Hashing`] when the hasher itself fails.
    pub fn hash(&self, plaintext: &str) -> Result<String, SecretError> {
        if plaintext.is_empty() {
            return Err(SecretError::EmptyPlaintext);
        }
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|_| SecretError::Hashing)?;
        Ok(hash.to_string())
    }

    /// Check a plaintext against a stored hash.
    ///
    /// Never fails: a malformed or empty stored hash verifies as `false`.
    /// The underlying comparison is constant-time.
    #[must_use]
    pub fn verify(&self, plaintext: &str, stored: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };
        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// [`Self::hash`] on a blocking worker, keeping the slow hash off the
    /// async executor.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::hash`].
    pub async fn hash_offloaded(&self, plaintext: SecretString) -> Result<String, SecretError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(plaintext.expose_secret()))
            .await
            .map_err(|_| SecretError::Hashing)?
    }

    /// [`Self::verify`] on a blocking worker.
    pub async fn verify_offloaded(&self, plaintext: SecretString, stored: String) -> bool {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(plaintext.expose_secret(), &stored))
            .await
            .unwrap_or(false)
    }
}
