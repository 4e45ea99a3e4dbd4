//! Domain outcomes of the auth flows.

use thiserror::Error;

/// Coarse classification used by the transport boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Unauthorized,
    Internal,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user not found")]
    UserNotFound,
    #[error("invalid password")]
    InvalidPassword,
    #[error("email already exists")]
    EmailExists,
    #[error("email not confirmed")]
    EmailNotConfirmed,
    /// Bad signature, wrong stamp, malformed claims or past expiry.
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("token invalidated by password change")]
    TokenInvalidatedByPasswordChange,
    #[error("invalid verification code")]
    InvalidCode,
    #[error("verification code expired")]
    CodeExpired,
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    #[error("refresh token expired")]
    RefreshTokenExpired,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound => ErrorKind::NotFound,
            Self::EmailExists => ErrorKind::Conflict,
            Self::InvalidPassword
            | Self::EmailNotConfirmed
            | Self::InvalidToken
            | Self::TokenInvalidatedByPasswordChange
            | Self::InvalidCode
            | Self::CodeExpired
            | Self::InvalidRefreshToken
            | Self::RefreshTokenExpired => ErrorKind::Unauthorized,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
