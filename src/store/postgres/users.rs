use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{is_unique_violation, query_span, PgStore};
use crate::auth::models::{Role, User};
use crate::store::{CreateOutcome, UserStore};

// Tokens carry epochs from the application clock, so the new epoch is bound
// from it too and never falls behind the stored one.
const UPDATE_PASSWORD_SQL: &str = r"
    UPDATE users
    SET password_hash = $1,
        password_changed_at = GREATEST($3, password_changed_at + interval '1 microsecond')
    WHERE id = $2
    RETURNING password_changed_at
";

fn user_from_row(row: &PgRow) -> Result<User> {
    let role: String = row.try_get("role").context("missing role column")?;
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: role.parse::<Role>().map_err(|err| anyhow!(err))?,
        confirmed: row.try_get("confirmed")?,
        external_id: row.try_get("external_id")?,
        created_at: row.try_get("created_at")?,
        password_changed_at: row.try_get("password_changed_at")?,
    })
}

#[async_trait]
impl UserStore for PgStore {
    async fn create(&self, user: &User) -> Result<CreateOutcome> {
        let query = r"
            INSERT INTO users
                (id, email, password_hash, role, confirmed, created_at, password_changed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
        ";
        let result = sqlx::query(query)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.confirmed)
            .bind(user.created_at)
            .bind(user.password_changed_at)
            .execute(self.pool())
            .instrument(query_span("INSERT", query))
            .await;

        match result {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::Conflict),
            Err(err) => Err(err).context("error creating user"),
        }
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let query = "SELECT id, email, password_hash, role, confirmed, external_id, created_at, password_changed_at FROM users WHERE id = $1";
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(self.pool())
            .instrument(query_span("SELECT", query))
            .await
            .context("error getting user by id")?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = "SELECT id, email, password_hash, role, confirmed, external_id, created_at, password_changed_at FROM users WHERE email = $1";
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(self.pool())
            .instrument(query_span("SELECT", query))
            .await
            .context("error getting user by email")?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let query = "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)";
        let exists: bool = sqlx::query_scalar(query)
            .bind(email)
            .fetch_one(self.pool())
            .instrument(query_span("SELECT", query))
            .await
            .context("error checking email existence")?;
        Ok(exists)
    }

    async fn confirm(&self, id: Uuid) -> Result<()> {
        let query = "UPDATE users SET confirmed = TRUE WHERE id = $1";
        sqlx::query(query)
            .bind(id)
            .execute(self.pool())
            .instrument(query_span("UPDATE", query))
            .await
            .context("error updating user confirmation")?;
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<DateTime<Utc>> {
        let query = UPDATE_PASSWORD_SQL;
        let changed_at: Option<DateTime<Utc>> = sqlx::query_scalar(query)
            .bind(password_hash)
            .bind(id)
            .bind(Utc::now())
            .fetch_optional(self.pool())
            .instrument(query_span("UPDATE", query))
            .await
            .context("error updating password")?;
        changed_at.ok_or_else(|| anyhow!("error updating password: user {id} does not exist"))
    }

    async fn update_external_id(&self, id: Uuid, external_id: &str) -> Result<()> {
        let query = "UPDATE users SET external_id = $1 WHERE id = $2";
        sqlx::query(query)
            .bind(external_id)
            .bind(id)
            .execute(self.pool())
            .instrument(query_span("UPDATE", query))
            .await
            .context("error updating external id")?;
        Ok(())
    }
}
