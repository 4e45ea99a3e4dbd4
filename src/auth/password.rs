//! Peppered Argon2id password hashing.
//!
//! A static server secret is appended to the password before hashing, so a
//! leaked `users` table alone is not enough to brute-force credentials. The
//! stored value is a PHC string and carries its own salt and cost parameters.

use anyhow::anyhow;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use secrecy::{ExposeSecret, SecretString};

use super::error::{AuthError, AuthResult};

#[derive(Clone)]
pub struct PasswordHasher {
    pepper: SecretString,
    params: Params,
}

impl PasswordHasher {
    #[must_use]
    pub fn new(pepper: SecretString) -> Self {
        Self {
            pepper,
            params: Params::default(),
        }
    }

    /// Override the Argon2 cost (memory in KiB, iterations, lanes).
    ///
    /// # Errors
    /// Returns an error if the parameters are outside Argon2's accepted range.
    pub fn with_cost(mut self, m_cost: u32, t_cost: u32, p_cost: u32) -> anyhow::Result<Self> {
        self.params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|err| anyhow!("invalid argon2 parameters: {err}"))?;
        Ok(self)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    fn peppered(&self, password: &str) -> String {
        format!("{password}{}", self.pepper.expose_secret())
    }

    /// Hash a password for storage.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if hashing fails.
    pub fn hash(&self, password: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(self.peppered(password).as_bytes(), &salt)
            .map_err(|err| anyhow!("error hashing password: {err}"))?;
        Ok(hash.to_string())
    }

    /// Check a password against a stored hash.
    ///
    /// # Errors
    /// Returns `AuthError::InvalidPassword` on any mismatch, including an
    /// unparseable stored hash.
    pub fn compare(&self, password: &str, hash: &str) -> AuthResult<()> {
        let parsed = PasswordHash::new(hash).map_err(|_| AuthError::InvalidPassword)?;
        // Verification uses the parameters recorded in the hash, not self.params.
        self.argon2()
            .verify_password(self.peppered(password).as_bytes(), &parsed)
            .map_err(|_| AuthError::InvalidPassword)
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("pepper", &"***")
            .field("params", &self.params)
            .finish()
    }
}
