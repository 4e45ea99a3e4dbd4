use anyhow::Result;
use secrecy::SecretString;

use super::{
    password::PasswordHasher,
    token::{TokenManager, DEFAULT_ACCESS_TTL_SECONDS, DEFAULT_REFRESH_TTL_SECONDS},
};

/// Argon2 cost parameters: memory in KiB, iterations, lanes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    jwt_secret: SecretString,
    token_stamp: SecretString,
    password_pepper: SecretString,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    hash_cost: Option<HashCost>,
}

impl AuthConfig {
    #[must_use]
    pub fn new(
        jwt_secret: SecretString,
        token_stamp: SecretString,
        password_pepper: SecretString,
    ) -> Self {
        Self {
            jwt_secret,
            token_stamp,
            password_pepper,
            access_ttl_seconds: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TTL_SECONDS,
            hash_cost: None,
        }
    }

    #[must_use]
    pub fn with_access_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_ttl_seconds = seconds;
        self
    }

    /// Override the Argon2 defaults. Only tests and constrained hosts need this.
    #[must_use]
    pub fn with_hash_cost(mut self, cost: HashCost) -> Self {
        self.hash_cost = Some(cost);
        self
    }

    #[must_use]
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_seconds
    }

    #[must_use]
    pub fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }

    #[must_use]
    pub fn token_manager(&self) -> TokenManager {
        TokenManager::new(self.jwt_secret.clone(), &self.token_stamp)
            .with_access_ttl_seconds(self.access_ttl_seconds)
            .with_refresh_ttl_seconds(self.refresh_ttl_seconds)
    }

    /// # Errors
    /// Returns an error if the configured hash cost is rejected by Argon2.
    pub fn password_hasher(&self) -> Result<PasswordHasher> {
        let hasher = PasswordHasher::new(self.password_pepper.clone());
        match self.hash_cost {
            Some(cost) => hasher.with_cost(cost.memory_kib, cost.iterations, cost.parallelism),
            None => Ok(hasher),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig::new(
            SecretString::from("jwt-secret".to_string()),
            SecretString::from("stamp".to_string()),
            SecretString::from("pepper".to_string()),
        )
    }

    #[test]
    fn defaults_match_token_ttls() {
        let config = config();
        assert_eq!(config.access_ttl_seconds(), 3600);
        assert_eq!(config.refresh_ttl_seconds(), 7 * 24 * 3600);
    }

    #[test]
    fn builders_override_ttls() {
        let config = config()
            .with_access_ttl_seconds(60)
            .with_refresh_ttl_seconds(120);
        assert_eq!(config.token_manager().access_ttl().num_seconds(), 60);
        assert_eq!(config.refresh_ttl_seconds(), 120);
    }

    #[test]
    fn invalid_hash_cost_is_rejected() {
        let config = config().with_hash_cost(HashCost {
            memory_kib: 1,
            iterations: 0,
            parallelism: 0,
        });
        assert!(config.password_hasher().is_err());
    }

    #[test]
    fn debug_redacts_secrets() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("jwt-secret"));
        assert!(!rendered.contains("\"stamp\""));
    }
}
