//! UserStore + TokenStore on PostgreSQL.

use anyhow::Result;
use async_trait::async_trait;
use byaboneka_core::store::{TokenStore, UserStore};
use byaboneka_core::types::{RefreshTokenRow, ResetTokenRow, User};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::PgStore;
use crate::rows::{RefreshRow, ResetRow, UserRow};

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, email, phone, display_name, password_hash, role, \
             trust_score, email_verified, phone_verified, is_banned, ban_reason, \
             cooperative_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .bind(user.role.to_string())
        .bind(user.trust_score)
        .bind(user.email_verified)
        .bind(user.phone_verified)
        .bind(user.is_banned)
        .bind(&user.ban_reason)
        .bind(user.cooperative_id)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn identity_taken(&self, email: &str, phone: Option<&str>) -> Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 OR ($2::text IS NOT NULL AND phone = $2))",
        )
        .bind(email)
        .bind(phone)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn set_banned(&self, id: Uuid, banned: bool, reason: Option<&str>) -> Result<()> {
        sqlx::query(
            "UPDATE users SET is_banned = $2, ban_reason = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(banned)
        .bind(reason)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_email_verified(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE users SET email_verified = TRUE, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_phone_verified(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE users SET phone_verified = TRUE, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_password_hash(&self, id: Uuid, hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(hash)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl TokenStore for PgStore {
    async fn insert_refresh(&self, row: &RefreshTokenRow) -> Result<()> {
        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, salt, expires_at, revoked_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(&row.token_hash)
        .bind(&row.salt)
        .bind(row.expires_at)
        .bind(row.revoked_at)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn refresh_by_id(&self, id: Uuid) -> Result<Option<RefreshTokenRow>> {
        let row = sqlx::query_as::<_, RefreshRow>("SELECT * FROM refresh_tokens WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(RefreshTokenRow::from))
    }

    async fn revoke_refresh(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $2 WHERE id = $1 AND revoked_at IS NULL",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn revoke_all_refresh(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $2 WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn insert_reset(&self, row: &ResetTokenRow) -> Result<()> {
        sqlx::query(
            "INSERT INTO password_reset_tokens (id, user_id, token_hash, expires_at, used_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(&row.token_hash)
        .bind(row.expires_at)
        .bind(row.used_at)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn consume_reset(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ResetTokenRow>> {
        // Single statement so two concurrent resets cannot both consume it.
        let row = sqlx::query_as::<_, ResetRow>(
            "UPDATE password_reset_tokens SET used_at = $2 \
             WHERE token_hash = $1 AND used_at IS NULL AND expires_at > $2 \
             RETURNING *",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ResetTokenRow::from))
    }
}
