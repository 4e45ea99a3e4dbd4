//! Access token signing/parsing and opaque refresh token generation.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind as JwtErrorKind, Algorithm, DecodingKey, EncodingKey,
    Header, Validation,
};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use super::models::{Role, TokenClaims};

pub const DEFAULT_ACCESS_TTL_SECONDS: i64 = 60 * 60;
pub const DEFAULT_REFRESH_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

const REFRESH_TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token")]
    Sign(#[source] jsonwebtoken::errors::Error),
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("invalid token: stamp mismatch")]
    StampMismatch,
    #[error("failed to generate refresh token")]
    Random(#[source] rand::Error),
}

/// Wire form of the access token payload.
///
/// Decoding into this struct is the only claim check: a missing or mistyped
/// field fails the whole token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct AccessClaims {
    user_id: Uuid,
    role: Role,
    exp: i64,
    pepper: String,
    /// `password_changed_at` in microseconds since the Unix epoch.
    pwd_changed: i64,
}

#[derive(Clone)]
pub struct TokenManager {
    secret: SecretString,
    stamp_digest: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenManager {
    /// `secret` signs tokens; `stamp` is the server-side marker every token
    /// must carry (embedded as a digest, never in the clear).
    #[must_use]
    pub fn new(secret: SecretString, stamp: &SecretString) -> Self {
        Self {
            secret,
            stamp_digest: stamp_digest(stamp.expose_secret()),
            access_ttl: Duration::seconds(DEFAULT_ACCESS_TTL_SECONDS),
            refresh_ttl: Duration::seconds(DEFAULT_REFRESH_TTL_SECONDS),
        }
    }

    #[must_use]
    pub fn with_access_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_ttl = Duration::seconds(seconds);
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_ttl = Duration::seconds(seconds);
        self
    }

    #[must_use]
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Expiry for a refresh session created or rotated now.
    #[must_use]
    pub fn refresh_expiry(&self) -> DateTime<Utc> {
        Utc::now() + self.refresh_ttl
    }

    /// Sign an access token. The expiry is fixed at issuance.
    ///
    /// # Errors
    /// Returns `TokenError::Sign` if encoding fails.
    pub fn generate_access_token(
        &self,
        user_id: Uuid,
        role: Role,
        password_changed_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = AccessClaims {
            user_id,
            role,
            exp: (Utc::now() + self.access_ttl).timestamp(),
            pepper: self.stamp_digest.clone(),
            pwd_changed: password_changed_at.timestamp_micros(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )
        .map_err(TokenError::Sign)
    }

    /// Verify signature, expiry and stamp, then return the typed claims.
    ///
    /// # Errors
    /// Returns `TokenError::Expired`, `TokenError::StampMismatch` or
    /// `TokenError::Invalid` for anything else.
    pub fn parse_access_token(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()),
            &validation,
        )
        .map_err(|err| match err.kind() {
            JwtErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(err),
        })?;

        let claims = data.claims;
        if claims.pepper != self.stamp_digest {
            return Err(TokenError::StampMismatch);
        }

        Ok(TokenClaims {
            user_id: claims.user_id,
            role: claims.role,
            expires_at: claims.exp,
            password_changed_at: claims.pwd_changed,
        })
    }

    /// Opaque random refresh token; not decodable, only looked up by digest.
    ///
    /// # Errors
    /// Returns `TokenError::Random` if the OS random source fails.
    pub fn generate_refresh_token(&self) -> Result<String, TokenError> {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        OsRng.try_fill_bytes(&mut bytes).map_err(TokenError::Random)?;
        Ok(Base64UrlUnpadded::encode_string(&bytes))
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("secret", &"***")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

/// Digest a refresh token so raw values never touch the store.
#[must_use]
pub fn hash_refresh_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

fn stamp_digest(stamp: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(stamp.as_bytes());
    Base64UrlUnpadded::encode_string(&hasher.finalize())
}
