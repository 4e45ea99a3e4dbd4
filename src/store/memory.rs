//! In-process store used by tests and local development without Postgres.
//!
//! All three tables sit behind one lock so conditional updates are atomic the
//! same way a single SQL statement is.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    next_password_epoch, CreateOutcome, RefreshSessionStore, UserStore, VerificationStore,
};
use crate::auth::models::{RefreshSession, User, VerificationCode, VerificationKind};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    codes: Vec<VerificationCode>,
    sessions: HashMap<Uuid, RefreshSession>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every code ever issued for `(email, kind)`, oldest first.
    pub async fn codes_for(&self, email: &str, kind: VerificationKind) -> Vec<VerificationCode> {
        let tables = self.tables.lock().await;
        tables
            .codes
            .iter()
            .filter(|code| code.email == email && code.kind == kind)
            .cloned()
            .collect()
    }

    pub async fn sessions_for_user(&self, user_id: Uuid) -> Vec<RefreshSession> {
        let tables = self.tables.lock().await;
        tables
            .sessions
            .values()
            .filter(|session| session.user_id == user_id)
            .cloned()
            .collect()
    }
}

fn newest_active<'a>(
    codes: &'a [VerificationCode],
    email: &str,
    kind: VerificationKind,
    now: DateTime<Utc>,
) -> Option<&'a VerificationCode> {
    codes
        .iter()
        .filter(|code| code.email == email && code.kind == kind && !code.used && code.expires_at > now)
        .max_by_key(|code| code.created_at)
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: &User) -> Result<CreateOutcome> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|existing| existing.email == user.email) {
            return Ok(CreateOutcome::Conflict);
        }
        tables.users.insert(user.id, user.clone());
        Ok(CreateOutcome::Created)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().find(|user| user.email == email).cloned())
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().any(|user| user.email == email))
    }

    async fn confirm(&self, id: Uuid) -> Result<()> {
        if let Some(user) = self.tables.lock().await.users.get_mut(&id) {
            user.confirmed = true;
        }
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<DateTime<Utc>> {
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| anyhow!("error updating password: user {id} does not exist"))?;
        let now = next_password_epoch(user.password_changed_at, Utc::now());
        user.password_hash = password_hash.to_string();
        user.password_changed_at = now;
        Ok(now)
    }

    async fn update_external_id(&self, id: Uuid, external_id: &str) -> Result<()> {
        if let Some(user) = self.tables.lock().await.users.get_mut(&id) {
            user.external_id = Some(external_id.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl VerificationStore for MemoryStore {
    async fn create(&self, code: &VerificationCode) -> Result<()> {
        self.tables.lock().await.codes.push(code.clone());
        Ok(())
    }

    async fn active_code(
        &self,
        email: &str,
        kind: VerificationKind,
    ) -> Result<Option<VerificationCode>> {
        let tables = self.tables.lock().await;
        Ok(newest_active(&tables.codes, email, kind, Utc::now()).cloned())
    }

    async fn mark_used(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        match tables.codes.iter_mut().find(|code| code.id == id && !code.used) {
            Some(code) => {
                code.used = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        let before = tables.codes.len();
        tables.codes.retain(|code| !code.used && code.expires_at > now);
        Ok((before - tables.codes.len()) as u64)
    }
}

#[async_trait]
impl RefreshSessionStore for MemoryStore {
    async fn create(&self, session: &RefreshSession) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if tables
            .sessions
            .values()
            .any(|existing| existing.token_hash == session.token_hash)
        {
            return Err(anyhow!("error creating refresh session: duplicate token hash"));
        }
        tables.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get_by_token_hash(&self, token_hash: &[u8]) -> Result<Option<RefreshSession>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .sessions
            .values()
            .find(|session| session.token_hash == token_hash)
            .cloned())
    }

    async fn rotate(
        &self,
        current_hash: &[u8],
        new_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        match tables
            .sessions
            .values_mut()
            .find(|session| session.token_hash == current_hash)
        {
            Some(session) => {
                session.token_hash = new_hash.to_vec();
                session.expires_at = expires_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.tables.lock().await.sessions.remove(&id);
        Ok(())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, session| session.user_id != user_id);
        Ok((before - tables.sessions.len()) as u64)
    }

    async fn delete_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, session| session.expires_at > now);
        Ok((before - tables.sessions.len()) as u64)
    }
}
