//! Domain records shared by the orchestrator and the stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Platform-wide role. Stored and transmitted as its lowercase name.
#[derive(ToSchema, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Author,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Author => "author",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "student" => Ok(Self::Student),
            "author" => Ok(Self::Author),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub confirmed: bool,
    /// External identity reference (OAuth subject), unused until federated login lands.
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Revocation epoch for access tokens; bumped on every password mutation.
    pub password_changed_at: DateTime<Utc>,
}

impl User {
    /// Build an unconfirmed student account, the only shape registration creates.
    #[must_use]
    pub fn new_student(email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            role: Role::Student,
            confirmed: false,
            external_id: None,
            created_at: now,
            password_changed_at: now,
        }
    }
}

/// Purpose a verification code was issued for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VerificationKind {
    Registration,
    Login,
    Password,
}

impl VerificationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::Login => "login",
            Self::Password => "password",
        }
    }
}

impl fmt::Display for VerificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "registration" => Ok(Self::Registration),
            "login" => Ok(Self::Login),
            "password" => Ok(Self::Password),
            other => Err(format!("unknown verification type: {other}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct VerificationCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub code: String,
    pub kind: VerificationKind,
    pub used: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// One row per signed-in device. The token digest and expiry are replaced in
/// place on rotation.
#[derive(Clone, Debug)]
pub struct RefreshSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: Vec<u8>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(ToSchema, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Validated access-token identity returned by `validate_token`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub role: Role,
    pub expires_at: i64,
    pub password_changed_at: i64,
}
