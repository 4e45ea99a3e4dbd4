use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{query_span, PgStore};
use crate::auth::models::RefreshSession;
use crate::store::RefreshSessionStore;

fn session_from_row(row: &PgRow) -> Result<RefreshSession> {
    Ok(RefreshSession {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        token_hash: row.try_get("token_hash")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl RefreshSessionStore for PgStore {
    async fn create(&self, session: &RefreshSession) -> Result<()> {
        let query = r"
            INSERT INTO refresh_sessions (id, user_id, token_hash, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
        ";
        sqlx::query(query)
            .bind(session.id)
            .bind(session.user_id)
            .bind(&session.token_hash)
            .bind(session.expires_at)
            .bind(session.created_at)
            .execute(self.pool())
            .instrument(query_span("INSERT", query))
            .await
            .context("error creating refresh session")?;
        Ok(())
    }

    async fn get_by_token_hash(&self, token_hash: &[u8]) -> Result<Option<RefreshSession>> {
        let query = r"
            SELECT id, user_id, token_hash, expires_at, created_at
            FROM refresh_sessions
            WHERE token_hash = $1
        ";
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(self.pool())
            .instrument(query_span("SELECT", query))
            .await
            .context("error getting refresh session")?;
        row.as_ref().map(session_from_row).transpose()
    }

    async fn rotate(
        &self,
        current_hash: &[u8],
        new_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let query = r"
            UPDATE refresh_sessions
            SET token_hash = $1, expires_at = $2
            WHERE token_hash = $3
        ";
        let result = sqlx::query(query)
            .bind(new_hash)
            .bind(expires_at)
            .bind(current_hash)
            .execute(self.pool())
            .instrument(query_span("UPDATE", query))
            .await
            .context("error rotating refresh session")?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let query = "DELETE FROM refresh_sessions WHERE id = $1";
        sqlx::query(query)
            .bind(id)
            .execute(self.pool())
            .instrument(query_span("DELETE", query))
            .await
            .context("error deleting refresh session")?;
        Ok(())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64> {
        let query = "DELETE FROM refresh_sessions WHERE user_id = $1";
        let result = sqlx::query(query)
            .bind(user_id)
            .execute(self.pool())
            .instrument(query_span("DELETE", query))
            .await
            .context("error deleting refresh sessions for user")?;
        Ok(result.rows_affected())
    }

    async fn delete_expired(&self) -> Result<u64> {
        let query = "DELETE FROM refresh_sessions WHERE expires_at <= NOW()";
        let result = sqlx::query(query)
            .execute(self.pool())
            .instrument(query_span("DELETE", query))
            .await
            .context("error deleting expired refresh sessions")?;
        Ok(result.rows_affected())
    }
}
