//! Persistence contracts for users, verification codes and refresh sessions.
//!
//! "Row not found" is always `Ok(None)` (or `false`); `Err` is reserved for the
//! store itself failing, carrying the operation as context.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::models::{RefreshSession, User, VerificationCode, VerificationKind};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Outcome of inserting a new user.
#[derive(Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    Conflict,
}

/// Epoch to record for a password change made at `now`.
///
/// Always later than `previous`, so tokens minted under the old epoch are
/// revoked even when `now` trails it.
#[must_use]
pub fn next_password_epoch(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    now.max(previous + chrono::Duration::microseconds(1))
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user; an existing email yields `CreateOutcome::Conflict`.
    async fn create(&self, user: &User) -> Result<CreateOutcome>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn email_exists(&self, email: &str) -> Result<bool>;
    async fn confirm(&self, id: Uuid) -> Result<()>;
    /// Replace the password hash and bump `password_changed_at`, returning the new epoch.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<DateTime<Utc>>;
    async fn update_external_id(&self, id: Uuid, external_id: &str) -> Result<()>;
}

#[async_trait]
pub trait VerificationStore: Send + Sync {
    async fn create(&self, code: &VerificationCode) -> Result<()>;
    /// Newest unused, unexpired code for `(email, kind)`.
    async fn active_code(
        &self,
        email: &str,
        kind: VerificationKind,
    ) -> Result<Option<VerificationCode>>;
    /// Flip `used` if it is still unset. Returns `false` if another caller got there first.
    async fn mark_used(&self, id: Uuid) -> Result<bool>;
    async fn delete_expired(&self) -> Result<u64>;
}

#[async_trait]
pub trait RefreshSessionStore: Send + Sync {
    async fn create(&self, session: &RefreshSession) -> Result<()>;
    async fn get_by_token_hash(&self, token_hash: &[u8]) -> Result<Option<RefreshSession>>;
    /// Swap the token digest and expiry of the row currently holding `current_hash`.
    ///
    /// This is a single conditional update; `false` means no row held
    /// `current_hash` any more (already rotated, deleted or never existed).
    async fn rotate(
        &self,
        current_hash: &[u8],
        new_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<bool>;
    async fn delete(&self, id: Uuid) -> Result<()>;
    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64>;
    async fn delete_expired(&self) -> Result<u64>;
}
