//! Registration, login, refresh and password-reset flows.
//!
//! All state lives in the stores; `AuthService` is cheap to clone and shared
//! across request handlers and the RPC server.
//!
//! ### Revocation
//!
//! Access tokens are never stored. Each one carries the user's
//! `password_changed_at` at issuance, and `validate_token` compares it with the
//! live value, so a password reset invalidates every outstanding access token
//! without a denylist. Refresh sessions are revoked by deleting their rows.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    config::AuthConfig,
    error::{AuthError, AuthResult},
    models::{RefreshSession, TokenClaims, TokenPair, User, VerificationKind},
    password::PasswordHasher,
    token::{hash_refresh_token, TokenError, TokenManager},
    verification::Verifier,
};
use crate::{
    email::EmailNotifier,
    store::{CreateOutcome, RefreshSessionStore, UserStore, VerificationStore},
};

/// Result of a credential check. Tokens are only ever issued after the code step.
#[derive(Debug, PartialEq, Eq)]
pub enum LoginOutcome {
    VerificationSent,
}

/// Rows removed by one sweeper pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub codes: u64,
    pub sessions: u64,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    codes: Arc<dyn VerificationStore>,
    sessions: Arc<dyn RefreshSessionStore>,
    verifier: Verifier,
    hasher: PasswordHasher,
    tokens: TokenManager,
}

impl AuthService {
    /// # Errors
    /// Returns an error if the password hasher cannot be built from `config`.
    pub fn new(
        users: Arc<dyn UserStore>,
        codes: Arc<dyn VerificationStore>,
        sessions: Arc<dyn RefreshSessionStore>,
        notifier: Arc<dyn EmailNotifier>,
        config: &AuthConfig,
    ) -> Result<Self> {
        Ok(Self {
            users,
            verifier: Verifier::new(codes.clone(), notifier),
            codes,
            sessions,
            hasher: config.password_hasher()?,
            tokens: config.token_manager(),
        })
    }

    /// Build a service over one backend implementing every store.
    ///
    /// # Errors
    /// Returns an error if the password hasher cannot be built from `config`.
    pub fn with_store<S>(
        store: Arc<S>,
        notifier: Arc<dyn EmailNotifier>,
        config: &AuthConfig,
    ) -> Result<Self>
    where
        S: UserStore + VerificationStore + RefreshSessionStore + 'static,
    {
        Self::new(store.clone(), store.clone(), store, notifier, config)
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Create an unconfirmed student and send a registration code.
    ///
    /// # Errors
    /// `EmailExists` if the address is taken.
    #[instrument(skip_all)]
    pub async fn register(&self, email: &str, password: &str) -> AuthResult<User> {
        if self.users.email_exists(email).await? {
            return Err(AuthError::EmailExists);
        }

        let password_hash = self.hasher.hash(password)?;
        let user = User::new_student(email.to_string(), password_hash);

        // The existence check is advisory; the unique index decides.
        if self.users.create(&user).await? == CreateOutcome::Conflict {
            return Err(AuthError::EmailExists);
        }

        self.verifier
            .issue(user.id, &user.email, VerificationKind::Registration)
            .await?;

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// # Errors
    /// `CodeExpired` or `InvalidCode` from the code check.
    #[instrument(skip_all)]
    pub async fn verify_email(&self, email: &str, code: &str) -> AuthResult<TokenPair> {
        let user_id = self
            .verifier
            .consume(email, VerificationKind::Registration, code)
            .await?;
        self.users.confirm(user_id).await?;
        let user = self.load_user(user_id).await?;

        info!(user_id = %user.id, "email confirmed");
        self.issue_tokens(&user).await
    }

    /// Check credentials and send a login code.
    ///
    /// # Errors
    /// `UserNotFound`, `InvalidPassword` or `EmailNotConfirmed`.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<LoginOutcome> {
        let user = self
            .users
            .get_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        self.hasher.compare(password, &user.password_hash)?;

        if !user.confirmed {
            return Err(AuthError::EmailNotConfirmed);
        }

        self.verifier
            .issue(user.id, &user.email, VerificationKind::Login)
            .await?;
        Ok(LoginOutcome::VerificationSent)
    }

    /// # Errors
    /// `CodeExpired` or `InvalidCode` from the code check.
    #[instrument(skip_all)]
    pub async fn verify_login(&self, email: &str, code: &str) -> AuthResult<TokenPair> {
        let user_id = self
            .verifier
            .consume(email, VerificationKind::Login, code)
            .await?;
        let user = self.load_user(user_id).await?;
        self.issue_tokens(&user).await
    }

    /// Exchange a refresh token for a new pair, rotating the session in place.
    ///
    /// The rotation is conditional on the presented token still being current,
    /// so of two concurrent calls with the same token only one succeeds.
    ///
    /// # Errors
    /// `InvalidRefreshToken` for unknown or already rotated tokens,
    /// `RefreshTokenExpired` (and the session is deleted) past expiry.
    #[instrument(skip_all)]
    pub async fn refresh_tokens(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let current_hash = hash_refresh_token(refresh_token);
        let session = self
            .sessions
            .get_by_token_hash(&current_hash)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        if Utc::now() > session.expires_at {
            self.sessions.delete(session.id).await?;
            return Err(AuthError::RefreshTokenExpired);
        }

        let user = self.load_user(session.user_id).await?;
        let access_token = self.mint_access_token(&user)?;
        let new_refresh = self.mint_refresh_token()?;

        let rotated = self
            .sessions
            .rotate(
                &current_hash,
                &hash_refresh_token(&new_refresh),
                self.tokens.refresh_expiry(),
            )
            .await?;
        if !rotated {
            warn!(user_id = %user.id, "refresh token reused during rotation");
            return Err(AuthError::InvalidRefreshToken);
        }

        Ok(TokenPair {
            access_token,
            refresh_token: new_refresh,
        })
    }

    /// # Errors
    /// `UserNotFound` if no account uses `email`.
    #[instrument(skip_all)]
    pub async fn initiate_password_reset(&self, email: &str) -> AuthResult<()> {
        let user = self
            .users
            .get_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        self.verifier
            .issue(user.id, &user.email, VerificationKind::Password)
            .await
    }

    /// Set a new password, bump the revocation epoch and drop every session.
    ///
    /// # Errors
    /// `CodeExpired` or `InvalidCode` from the code check.
    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        let user_id = self
            .verifier
            .consume(email, VerificationKind::Password, code)
            .await?;

        let password_hash = self.hasher.hash(new_password)?;
        self.users.update_password(user_id, &password_hash).await?;
        let revoked = self.sessions.delete_for_user(user_id).await?;

        info!(user_id = %user_id, revoked_sessions = revoked, "password reset");
        Ok(())
    }

    /// Verify signature, stamp and expiry, then check the epoch against the live user.
    ///
    /// # Errors
    /// `InvalidToken` for anything wrong with the token itself,
    /// `TokenInvalidatedByPasswordChange` when the password changed after issuance.
    pub async fn validate_token(&self, token: &str) -> AuthResult<TokenClaims> {
        let claims = self.tokens.parse_access_token(token).map_err(|err| match err {
            TokenError::Sign(_) | TokenError::Random(_) => AuthError::Internal(err.into()),
            TokenError::Expired | TokenError::Invalid(_) | TokenError::StampMismatch => {
                AuthError::InvalidToken
            }
        })?;

        let user = self
            .users
            .get_by_id(claims.user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if user.password_changed_at.timestamp_micros() > claims.password_changed_at {
            return Err(AuthError::TokenInvalidatedByPasswordChange);
        }

        Ok(claims)
    }

    /// Link an external identity to a user.
    ///
    /// # Errors
    /// `UserNotFound` if the user does not exist.
    pub async fn update_external_id(&self, user_id: Uuid, external_id: &str) -> AuthResult<()> {
        self.load_user(user_id).await?;
        self.users.update_external_id(user_id, external_id).await?;
        Ok(())
    }

    /// Remove expired codes and sessions.
    ///
    /// # Errors
    /// Returns an error if either delete fails.
    pub async fn sweep_expired(&self) -> Result<SweepReport> {
        let codes = self
            .codes
            .delete_expired()
            .await
            .context("error sweeping verification codes")?;
        let sessions = self
            .sessions
            .delete_expired()
            .await
            .context("error sweeping refresh sessions")?;
        Ok(SweepReport { codes, sessions })
    }

    async fn load_user(&self, user_id: Uuid) -> AuthResult<User> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    fn mint_access_token(&self, user: &User) -> AuthResult<String> {
        self.tokens
            .generate_access_token(user.id, user.role, user.password_changed_at)
            .map_err(|err| AuthError::Internal(err.into()))
    }

    fn mint_refresh_token(&self) -> AuthResult<String> {
        self.tokens
            .generate_refresh_token()
            .map_err(|err| AuthError::Internal(err.into()))
    }

    async fn issue_tokens(&self, user: &User) -> AuthResult<TokenPair> {
        let access_token = self.mint_access_token(user)?;
        let refresh_token = self.mint_refresh_token()?;

        let session = RefreshSession {
            id: Uuid::new_v4(),
            user_id: user.id,
            token_hash: hash_refresh_token(&refresh_token),
            expires_at: self.tokens.refresh_expiry(),
            created_at: Utc::now(),
        };
        self.sessions.create(&session).await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}
