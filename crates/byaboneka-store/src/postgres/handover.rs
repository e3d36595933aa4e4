//! HandoverStore on PostgreSQL.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use byaboneka_core::store::HandoverStore;
use byaboneka_core::types::HandoverConfirmation;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::PgStore;
use crate::rows::HandoverRow;

#[async_trait]
impl HandoverStore for PgStore {
    async fn insert_confirmation(&self, confirmation: &HandoverConfirmation) -> Result<()> {
        sqlx::query(
            "INSERT INTO handover_confirmations (id, claim_id, otp_hash, expires_at, \
             verified, attempts, max_attempts, redeemed_by, redeemed_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(confirmation.id)
        .bind(confirmation.claim_id)
        .bind(&confirmation.otp_hash)
        .bind(confirmation.expires_at)
        .bind(confirmation.verified)
        .bind(confirmation.attempts)
        .bind(confirmation.max_attempts)
        .bind(confirmation.redeemed_by)
        .bind(confirmation.redeemed_at)
        .bind(confirmation.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn confirmation_for(&self, claim_id: Uuid) -> Result<Option<HandoverConfirmation>> {
        let row = sqlx::query_as::<_, HandoverRow>(
            "SELECT * FROM handover_confirmations WHERE claim_id = $1",
        )
        .bind(claim_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(HandoverConfirmation::from))
    }

    async fn delete_confirmation(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM handover_confirmations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_failed_redeem(&self, id: Uuid) -> Result<i32> {
        let attempts = sqlx::query_scalar::<_, i32>(
            "UPDATE handover_confirmations SET attempts = attempts + 1 \
             WHERE id = $1 RETURNING attempts",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(attempts)
    }

    async fn commit_redeem(
        &self,
        claim_id: Uuid,
        confirmation_id: Uuid,
        redeemed_by: Uuid,
        redeemed_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        // Serialize against concurrent verifications/redemptions on the claim.
        let claim = sqlx::query_as::<_, crate::rows::ClaimRow>(
            "SELECT * FROM claims WHERE id = $1 FOR UPDATE",
        )
        .bind(claim_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| anyhow!("claim {} vanished mid-transaction", claim_id))?;

        // Guarded update: a second successful redemption matches zero rows.
        let updated = sqlx::query(
            "UPDATE handover_confirmations \
             SET verified = TRUE, attempts = attempts + 1, redeemed_by = $2, redeemed_at = $3 \
             WHERE id = $1 AND verified = FALSE",
        )
        .bind(confirmation_id)
        .bind(redeemed_by)
        .bind(redeemed_at)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            // Already verified; dropping the transaction rolls back.
            return Ok(false);
        }

        let now = Utc::now();
        sqlx::query("UPDATE claims SET status = 'returned', updated_at = $2 WHERE id = $1")
            .bind(claim_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE lost_items SET status = 'returned', updated_at = $2 WHERE id = $1")
            .bind(claim.lost_item_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE found_items SET status = 'returned', updated_at = $2 WHERE id = $1")
            .bind(claim.found_item_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}
