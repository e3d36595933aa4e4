//! ActivityStore + ReportStore + AuditStore on PostgreSQL.

use anyhow::Result;
use async_trait::async_trait;
use byaboneka_core::store::{ActivityStore, AuditStore, ReportStore};
use byaboneka_core::types::{
    ActionKind, ActionLogEntry, AuditEntry, ReportStatus, ScamReport,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::PgStore;
use crate::rows::{AuditRow, ScamReportRow};

#[async_trait]
impl ActivityStore for PgStore {
    async fn log_action(&self, entry: &ActionLogEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO action_log (id, user_id, kind, ip, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.kind.to_string())
        .bind(&entry.ip)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn actions_since(
        &self,
        user_id: Uuid,
        kind: Option<ActionKind>,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT count(*) FROM action_log \
             WHERE user_id = $1 AND created_at >= $2 \
               AND ($3::text IS NULL OR kind = $3)",
        )
        .bind(user_id)
        .bind(since)
        .bind(kind.map(|k| k.to_string()))
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn failed_attempts_since(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT count(*) FROM verification_attempts \
             WHERE user_id = $1 AND status = 'failed' AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn distinct_failed_items_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT count(DISTINCT c.lost_item_id) \
             FROM verification_attempts a JOIN claims c ON c.id = a.claim_id \
             WHERE a.user_id = $1 AND a.status = 'failed' AND a.created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn accounts_on_ip_since(
        &self,
        ip: &str,
        excluding: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT count(DISTINCT user_id) FROM action_log \
             WHERE ip = $1 AND user_id <> $2 AND created_at >= $3",
        )
        .bind(ip)
        .bind(excluding)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn ip_seen_for_user(&self, user_id: Uuid, ip: &str) -> Result<bool> {
        let seen = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM action_log WHERE user_id = $1 AND ip = $2)",
        )
        .bind(user_id)
        .bind(ip)
        .fetch_one(&self.pool)
        .await?;
        Ok(seen)
    }
}

#[async_trait]
impl ReportStore for PgStore {
    async fn insert_report(&self, report: &ScamReport) -> Result<()> {
        sqlx::query(
            "INSERT INTO scam_reports (id, reporter_id, reported_user_id, claim_id, \
             message_excerpt, flagged, status, resolved_by, created_at, resolved_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(report.id)
        .bind(report.reporter_id)
        .bind(report.reported_user_id)
        .bind(report.claim_id)
        .bind(&report.message_excerpt)
        .bind(report.flagged)
        .bind(report.status.to_string())
        .bind(report.resolved_by)
        .bind(report.created_at)
        .bind(report.resolved_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn report_by_id(&self, id: Uuid) -> Result<Option<ScamReport>> {
        let row = sqlx::query_as::<_, ScamReportRow>("SELECT * FROM scam_reports WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(ScamReport::try_from).transpose()
    }

    async fn open_reports(&self, limit: i64) -> Result<Vec<ScamReport>> {
        let rows = sqlx::query_as::<_, ScamReportRow>(
            "SELECT * FROM scam_reports WHERE status = 'open' ORDER BY created_at LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ScamReport::try_from).collect()
    }

    async fn resolve_report(
        &self,
        id: Uuid,
        status: ReportStatus,
        resolved_by: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE scam_reports SET status = $2, resolved_by = $3, resolved_at = $4 \
             WHERE id = $1 AND status = 'open'",
        )
        .bind(id)
        .bind(status.to_string())
        .bind(resolved_by)
        .bind(resolved_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO audit_log (id, actor_id, action, entity, entity_id, detail, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.id)
        .bind(entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.entity)
        .bind(entry.entity_id)
        .bind(&entry.detail)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn audit_for_entity(
        &self,
        entity: &str,
        entity_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AuditEntry>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT * FROM audit_log WHERE entity = $1 AND entity_id = $2 \
             ORDER BY created_at DESC LIMIT $3",
        )
        .bind(entity)
        .bind(entity_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(AuditEntry::from).collect())
    }

    async fn recent_audit(&self, limit: i64) -> Result<Vec<AuditEntry>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT * FROM audit_log ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(AuditEntry::from).collect())
    }
}
