use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{query_span, PgStore};
use crate::auth::models::{VerificationCode, VerificationKind};
use crate::store::VerificationStore;

fn code_from_row(row: &PgRow) -> Result<VerificationCode> {
    let kind: String = row.try_get("kind").context("missing kind column")?;
    Ok(VerificationCode {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        email: row.try_get("email")?,
        code: row.try_get("code")?,
        kind: kind.parse::<VerificationKind>().map_err(|err| anyhow!(err))?,
        used: row.try_get("used")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl VerificationStore for PgStore {
    async fn create(&self, code: &VerificationCode) -> Result<()> {
        let query = r"
            INSERT INTO verification_codes
                (id, user_id, email, code, kind, used, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ";
        sqlx::query(query)
            .bind(code.id)
            .bind(code.user_id)
            .bind(&code.email)
            .bind(&code.code)
            .bind(code.kind.as_str())
            .bind(code.used)
            .bind(code.expires_at)
            .bind(code.created_at)
            .execute(self.pool())
            .instrument(query_span("INSERT", query))
            .await
            .context("error creating verification code")?;
        Ok(())
    }

    async fn active_code(
        &self,
        email: &str,
        kind: VerificationKind,
    ) -> Result<Option<VerificationCode>> {
        let query = r"
            SELECT id, user_id, email, code, kind, used, expires_at, created_at
            FROM verification_codes
            WHERE email = $1
              AND kind = $2
              AND used = FALSE
              AND expires_at > NOW()
            ORDER BY created_at DESC
            LIMIT 1
        ";
        let row = sqlx::query(query)
            .bind(email)
            .bind(kind.as_str())
            .fetch_optional(self.pool())
            .instrument(query_span("SELECT", query))
            .await
            .context("error getting verification code")?;
        row.as_ref().map(code_from_row).transpose()
    }

    async fn mark_used(&self, id: Uuid) -> Result<bool> {
        let query = "UPDATE verification_codes SET used = TRUE WHERE id = $1 AND used = FALSE";
        let result = sqlx::query(query)
            .bind(id)
            .execute(self.pool())
            .instrument(query_span("UPDATE", query))
            .await
            .context("error marking verification code as used")?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_expired(&self) -> Result<u64> {
        let query = "DELETE FROM verification_codes WHERE expires_at <= NOW() OR used = TRUE";
        let result = sqlx::query(query)
            .execute(self.pool())
            .instrument(query_span("DELETE", query))
            .await
            .context("error deleting expired verification codes")?;
        Ok(result.rows_affected())
    }
}
