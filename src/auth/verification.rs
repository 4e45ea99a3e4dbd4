//! Issue and consume one-time email codes.

use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{
    code::generate_code,
    error::{AuthError, AuthResult},
    models::{VerificationCode, VerificationKind},
};
use crate::{email::EmailNotifier, store::VerificationStore};

pub const CODE_TTL_MINUTES: i64 = 5;

#[derive(Clone)]
pub struct Verifier {
    store: Arc<dyn VerificationStore>,
    notifier: Arc<dyn EmailNotifier>,
}

impl Verifier {
    #[must_use]
    pub fn new(store: Arc<dyn VerificationStore>, notifier: Arc<dyn EmailNotifier>) -> Self {
        Self { store, notifier }
    }

    /// Persist a fresh code, then deliver it.
    ///
    /// A delivery failure is returned as-is; the stored code stays valid until
    /// it expires.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if generation, persistence or delivery fails.
    #[instrument(skip(self, email), fields(kind = %kind))]
    pub async fn issue(&self, user_id: Uuid, email: &str, kind: VerificationKind) -> AuthResult<()> {
        let now = Utc::now();
        let code = VerificationCode {
            id: Uuid::new_v4(),
            user_id,
            email: email.to_string(),
            code: generate_code()?,
            kind,
            used: false,
            expires_at: now + Duration::minutes(CODE_TTL_MINUTES),
            created_at: now,
        };

        self.store.create(&code).await?;

        self.notifier
            .send_code(email, &code.code, kind)
            .await
            .context("error delivering verification code")?;

        debug!("verification code issued");
        Ok(())
    }

    /// Check `submitted` against the newest live code and mark it used on match.
    ///
    /// A wrong guess leaves the code untouched.
    ///
    /// # Errors
    /// `CodeExpired` when no live code exists, `InvalidCode` on mismatch.
    #[instrument(skip(self, email, submitted), fields(kind = %kind))]
    pub async fn consume(
        &self,
        email: &str,
        kind: VerificationKind,
        submitted: &str,
    ) -> AuthResult<Uuid> {
        let Some(code) = self.store.active_code(email, kind).await? else {
            return Err(AuthError::CodeExpired);
        };

        if code.code != submitted {
            return Err(AuthError::InvalidCode);
        }

        // Lost a race with a concurrent consumer of the same code.
        if !self.store.mark_used(code.id).await? {
            return Err(AuthError::CodeExpired);
        }

        Ok(code.user_id)
    }
}
