//! ClaimStore on PostgreSQL.
//!
//! Every compound operation locks the claim row first (`FOR UPDATE`), so
//! concurrent verification attempts and redemptions on one claim serialize
//! at the database and the attempts counter reflects a total order.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use byaboneka_core::store::ClaimStore;
use byaboneka_core::types::{
    Claim, ClaimStatus, Dispute, DisputeResolution, VerificationAttempt,
};
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use super::PgStore;
use crate::rows::{ClaimRow, DisputeRow};

/// Lock and fetch a claim inside an open transaction.
async fn lock_claim(conn: &mut PgConnection, claim_id: Uuid) -> Result<ClaimRow> {
    sqlx::query_as::<_, ClaimRow>("SELECT * FROM claims WHERE id = $1 FOR UPDATE")
        .bind(claim_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| anyhow!("claim {} vanished mid-transaction", claim_id))
}

async fn append_attempt(
    conn: &mut PgConnection,
    attempt: &VerificationAttempt,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO verification_attempts (id, claim_id, user_id, correct_answers, status, ip, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(attempt.id)
    .bind(attempt.claim_id)
    .bind(attempt.user_id)
    .bind(attempt.correct_answers)
    .bind(attempt.status.to_string())
    .bind(&attempt.ip)
    .bind(attempt.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Align item statuses with a claim state inside an open transaction.
async fn set_item_statuses(
    conn: &mut PgConnection,
    lost_item_id: Uuid,
    found_item_id: Uuid,
    lost_status: &str,
    found_status: &str,
) -> Result<()> {
    let now = Utc::now();
    sqlx::query("UPDATE lost_items SET status = $2, updated_at = $3 WHERE id = $1")
        .bind(lost_item_id)
        .bind(lost_status)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    sqlx::query("UPDATE found_items SET status = $2, updated_at = $3 WHERE id = $1")
        .bind(found_item_id)
        .bind(found_status)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[async_trait]
impl ClaimStore for PgStore {
    async fn insert_claim(&self, claim: &Claim) -> Result<()> {
        sqlx::query(
            "INSERT INTO claims (id, lost_item_id, found_item_id, claimant_id, status, \
             verification_score, attempts_made, consecutive_failures, next_attempt_at, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(claim.id)
        .bind(claim.lost_item_id)
        .bind(claim.found_item_id)
        .bind(claim.claimant_id)
        .bind(claim.status.to_string())
        .bind(claim.verification_score)
        .bind(claim.attempts_made)
        .bind(claim.consecutive_failures)
        .bind(claim.next_attempt_at)
        .bind(claim.created_at)
        .bind(claim.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn claim_by_id(&self, id: Uuid) -> Result<Option<Claim>> {
        let row = sqlx::query_as::<_, ClaimRow>("SELECT * FROM claims WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Claim::try_from).transpose()
    }

    async fn live_claim_exists(
        &self,
        lost_item_id: Uuid,
        found_item_id: Uuid,
        claimant_id: Uuid,
    ) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM claims \
             WHERE lost_item_id = $1 AND found_item_id = $2 AND claimant_id = $3 \
               AND status IN ('pending', 'verified', 'disputed'))",
        )
        .bind(lost_item_id)
        .bind(found_item_id)
        .bind(claimant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn live_claim_count(&self, claimant_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT count(*) FROM claims \
             WHERE claimant_id = $1 AND status IN ('pending', 'verified', 'disputed')",
        )
        .bind(claimant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn attempts_since(&self, claim_id: Uuid, since: DateTime<Utc>) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT count(*) FROM verification_attempts WHERE claim_id = $1 AND created_at >= $2",
        )
        .bind(claim_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn commit_verification_pass(
        &self,
        claim_id: Uuid,
        attempt: &VerificationAttempt,
        score: f64,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let claim = lock_claim(&mut *tx, claim_id).await?;

        append_attempt(&mut *tx, attempt).await?;

        sqlx::query(
            "UPDATE claims SET status = 'verified', verification_score = $2, \
             attempts_made = attempts_made + 1, consecutive_failures = 0, \
             next_attempt_at = NULL, updated_at = $3 WHERE id = $1",
        )
        .bind(claim_id)
        .bind(score)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        set_item_statuses(
            &mut *tx,
            claim.lost_item_id,
            claim.found_item_id,
            "claimed",
            "matched",
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn commit_verification_failure(
        &self,
        claim_id: Uuid,
        attempt: &VerificationAttempt,
        score: f64,
        consecutive_failures: i32,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        lock_claim(&mut *tx, claim_id).await?;

        append_attempt(&mut *tx, attempt).await?;

        sqlx::query(
            "UPDATE claims SET verification_score = $2, attempts_made = attempts_made + 1, \
             consecutive_failures = $3, next_attempt_at = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(claim_id)
        .bind(score)
        .bind(consecutive_failures)
        .bind(next_attempt_at)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn commit_cancel(&self, claim_id: Uuid, was_verified: bool) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let claim = lock_claim(&mut *tx, claim_id).await?;

        sqlx::query("UPDATE claims SET status = 'cancelled', updated_at = $2 WHERE id = $1")
            .bind(claim_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        if was_verified {
            set_item_statuses(
                &mut *tx,
                claim.lost_item_id,
                claim.found_item_id,
                "active",
                "unclaimed",
            )
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn expire_stale_claims(&self, cutoff: DateTime<Utc>, batch: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE claims SET status = 'expired', updated_at = $2 \
             WHERE id IN (SELECT id FROM claims \
                          WHERE status = 'pending' AND created_at < $1 LIMIT $3)",
        )
        .bind(cutoff)
        .bind(Utc::now())
        .bind(batch)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn insert_dispute(&self, dispute: &Dispute) -> Result<()> {
        sqlx::query(
            "INSERT INTO disputes (id, claim_id, opened_by, reason_text, resolution, \
             resolved_by, notes, created_at, resolved_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(dispute.id)
        .bind(dispute.claim_id)
        .bind(dispute.opened_by)
        .bind(&dispute.reason_text)
        .bind(dispute.resolution.map(|r| r.to_string()))
        .bind(dispute.resolved_by)
        .bind(&dispute.notes)
        .bind(dispute.created_at)
        .bind(dispute.resolved_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn dispute_by_id(&self, id: Uuid) -> Result<Option<Dispute>> {
        let row = sqlx::query_as::<_, DisputeRow>("SELECT * FROM disputes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Dispute::try_from).transpose()
    }

    async fn active_dispute_for(&self, claim_id: Uuid) -> Result<Option<Dispute>> {
        let row = sqlx::query_as::<_, DisputeRow>(
            "SELECT * FROM disputes WHERE claim_id = $1 AND resolution IS NULL",
        )
        .bind(claim_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Dispute::try_from).transpose()
    }

    async fn commit_dispute_open(&self, claim_id: Uuid, dispute: &Dispute) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        lock_claim(&mut *tx, claim_id).await?;

        sqlx::query(
            "INSERT INTO disputes (id, claim_id, opened_by, reason_text, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(dispute.id)
        .bind(dispute.claim_id)
        .bind(dispute.opened_by)
        .bind(&dispute.reason_text)
        .bind(dispute.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE claims SET status = 'disputed', updated_at = $2 WHERE id = $1")
            .bind(claim_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn commit_dispute_resolution(
        &self,
        dispute_id: Uuid,
        resolution: DisputeResolution,
        resolved_by: Uuid,
        target: ClaimStatus,
        notes: Option<&str>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let dispute = sqlx::query_as::<_, DisputeRow>(
            "SELECT * FROM disputes WHERE id = $1 FOR UPDATE",
        )
        .bind(dispute_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| anyhow!("dispute {} vanished mid-transaction", dispute_id))?;

        let claim = lock_claim(&mut *tx, dispute.claim_id).await?;
        let now = Utc::now();

        sqlx::query(
            "UPDATE disputes SET resolution = $2, resolved_by = $3, notes = $4, resolved_at = $5 \
             WHERE id = $1",
        )
        .bind(dispute_id)
        .bind(resolution.to_string())
        .bind(resolved_by)
        .bind(notes)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE claims SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(claim.id)
            .bind(target.to_string())
            .bind(now)
            .execute(&mut *tx)
            .await?;

        // Item statuses follow the claim's landing state.
        let (lost_status, found_status) = if target == ClaimStatus::Verified {
            ("claimed", "matched")
        } else {
            ("active", "unclaimed")
        };
        set_item_statuses(
            &mut *tx,
            claim.lost_item_id,
            claim.found_item_id,
            lost_status,
            found_status,
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
