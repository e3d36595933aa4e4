//! TrustStore on PostgreSQL.
//!
//! The append is one transaction holding the user row lock: event insert,
//! materialized score update and the auto-ban all land together, and deltas
//! for one user apply serially.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use byaboneka_core::store::TrustStore;
use byaboneka_core::trust::{self, TrustReason};
use byaboneka_core::types::TrustEvent;
use chrono::Utc;
use uuid::Uuid;

use super::PgStore;
use crate::rows::TrustEventRow;

#[async_trait]
impl TrustStore for PgStore {
    async fn append_trust_event(
        &self,
        user_id: Uuid,
        reason: TrustReason,
    ) -> Result<TrustEvent> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<_, i32>(
            "SELECT trust_score FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| anyhow!("user {} not found for trust write", user_id))?;

        let delta = reason.delta();
        let applied = trust::apply_delta(current, delta);
        let now = Utc::now();

        let event = TrustEvent {
            id: Uuid::new_v4(),
            user_id,
            delta,
            reason,
            new_score: applied.new_score,
            created_at: now,
        };

        sqlx::query(
            "INSERT INTO trust_events (id, user_id, delta, reason, new_score, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(event.id)
        .bind(event.user_id)
        .bind(event.delta)
        .bind(event.reason.to_string())
        .bind(event.new_score)
        .bind(event.created_at)
        .execute(&mut *tx)
        .await?;

        if applied.auto_ban {
            sqlx::query(
                "UPDATE users SET trust_score = $2, is_banned = TRUE, ban_reason = $3, \
                 updated_at = $4 WHERE id = $1",
            )
            .bind(user_id)
            .bind(applied.new_score)
            .bind(trust::AUTO_BAN_REASON)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query("UPDATE users SET trust_score = $2, updated_at = $3 WHERE id = $1")
                .bind(user_id)
                .bind(applied.new_score)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(event)
    }

    async fn trust_events_for(&self, user_id: Uuid) -> Result<Vec<TrustEvent>> {
        let rows = sqlx::query_as::<_, TrustEventRow>(
            "SELECT * FROM trust_events WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TrustEvent::try_from).collect()
    }
}
