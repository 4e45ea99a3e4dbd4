#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edu_auth::{
    auth::{
        models::RefreshSession, AuthConfig, AuthService, HashCost, Role, User, VerificationKind,
    },
    email::EmailNotifier,
    store::{MemoryStore, RefreshSessionStore, UserStore, VerificationStore},
};
use secrecy::SecretString;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use tokio::sync::Barrier;
use uuid::Uuid;

pub const PASSWORD: &str = "Password1";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentCode {
    pub to: String,
    pub code: String,
    pub kind: VerificationKind,
}

/// Notifier that keeps every delivery in memory.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentCode>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<SentCode> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    pub fn last(&self, to: &str, kind: VerificationKind) -> Result<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|sent| sent.to == to && sent.kind == kind)
            .map(|sent| sent.code)
            .ok_or_else(|| anyhow!("no {kind} code delivered to {to}"))
    }
}

#[async_trait]
impl EmailNotifier for RecordingNotifier {
    async fn send_code(&self, to: &str, code: &str, kind: VerificationKind) -> Result<()> {
        self.sent
            .lock()
            .map_err(|_| anyhow!("notifier lock poisoned"))?
            .push(SentCode {
                to: to.to_string(),
                code: code.to_string(),
                kind,
            });
        Ok(())
    }
}

/// Session store whose first `parties` lookups wait for each other before
/// returning, so that many refreshes all read the session before any rotates.
pub struct LookupBarrierSessions {
    inner: Arc<MemoryStore>,
    barrier: Barrier,
    parties: usize,
    lookups: AtomicUsize,
}

impl LookupBarrierSessions {
    pub fn new(inner: Arc<MemoryStore>, parties: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(parties),
            parties,
            lookups: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RefreshSessionStore for LookupBarrierSessions {
    async fn create(&self, session: &RefreshSession) -> Result<()> {
        RefreshSessionStore::create(&*self.inner, session).await
    }

    async fn get_by_token_hash(&self, token_hash: &[u8]) -> Result<Option<RefreshSession>> {
        let found = self.inner.get_by_token_hash(token_hash).await?;
        if self.lookups.fetch_add(1, Ordering::SeqCst) < self.parties {
            self.barrier.wait().await;
        }
        Ok(found)
    }

    async fn rotate(
        &self,
        current_hash: &[u8],
        new_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        self.inner.rotate(current_hash, new_hash, expires_at).await
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.inner.delete(id).await
    }

    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64> {
        self.inner.delete_for_user(user_id).await
    }

    async fn delete_expired(&self) -> Result<u64> {
        RefreshSessionStore::delete_expired(&*self.inner).await
    }
}

pub struct Harness {
    pub auth: AuthService,
    pub store: Arc<MemoryStore>,
    pub mail: Arc<RecordingNotifier>,
}

pub fn config() -> AuthConfig {
    AuthConfig::new(
        SecretString::from("integration-jwt-secret".to_string()),
        SecretString::from("integration-stamp".to_string()),
        SecretString::from("integration-pepper".to_string()),
    )
    .with_hash_cost(HashCost {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
}

pub fn harness() -> Result<Harness> {
    harness_with(&config())
}

pub fn harness_with(config: &AuthConfig) -> Result<Harness> {
    let store = Arc::new(MemoryStore::new());
    let mail = Arc::new(RecordingNotifier::default());
    let auth = AuthService::with_store(store.clone(), mail.clone(), config)?;
    Ok(Harness { auth, store, mail })
}

/// Harness whose first `parties` refresh lookups are held until all have read.
pub fn racing_harness(parties: usize) -> Result<Harness> {
    let store = Arc::new(MemoryStore::new());
    let mail = Arc::new(RecordingNotifier::default());
    let sessions = Arc::new(LookupBarrierSessions::new(store.clone(), parties));
    let auth = AuthService::new(store.clone(), store.clone(), sessions, mail.clone(), &config())?;
    Ok(Harness { auth, store, mail })
}

impl Harness {
    /// Register and confirm `email`, returning the user id and the first token pair.
    pub async fn confirmed_user(
        &self,
        email: &str,
    ) -> Result<(Uuid, edu_auth::auth::TokenPair)> {
        let user = self.auth.register(email, PASSWORD).await?;
        let code = self.mail.last(email, VerificationKind::Registration)?;
        let pair = self.auth.verify_email(email, &code).await?;
        Ok((user.id, pair))
    }

    /// Log in through both steps.
    pub async fn login(&self, email: &str, password: &str) -> Result<edu_auth::auth::TokenPair> {
        self.auth.login(email, password).await?;
        let code = self.mail.last(email, VerificationKind::Login)?;
        Ok(self.auth.verify_login(email, &code).await?)
    }

    /// Insert a confirmed user with `role` directly and mint an access token for it.
    pub async fn token_for_role(&self, email: &str, role: Role) -> Result<(Uuid, String)> {
        let mut user = User::new_student(email.to_string(), "unused-hash".to_string());
        user.role = role;
        user.confirmed = true;
        UserStore::create(&*self.store, &user).await?;
        let token = self
            .auth
            .tokens()
            .generate_access_token(user.id, role, user.password_changed_at)?;
        Ok((user.id, token))
    }

    pub async fn active_code(&self, email: &str, kind: VerificationKind) -> Result<Option<String>> {
        Ok(self
            .store
            .active_code(email, kind)
            .await?
            .map(|code| code.code))
    }
}
