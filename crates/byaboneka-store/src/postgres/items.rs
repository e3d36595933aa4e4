//! ItemStore + SecretStore on PostgreSQL.

use anyhow::Result;
use async_trait::async_trait;
use byaboneka_core::store::{ItemStore, SecretStore};
use byaboneka_core::types::{Category, FoundItem, LostItem, SecretQuestion};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::PgStore;
use crate::rows::{FoundItemRow, LostItemRow, SecretQuestionRow};

#[async_trait]
impl ItemStore for PgStore {
    async fn insert_lost(&self, item: &LostItem) -> Result<()> {
        sqlx::query(
            "INSERT INTO lost_items (id, owner_id, category, title, description, \
             location_area, lost_date, keywords, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(item.id)
        .bind(item.owner_id)
        .bind(item.category.to_string())
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.location_area)
        .bind(item.lost_date)
        .bind(&item.keywords)
        .bind(item.status.to_string())
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_found(&self, item: &FoundItem) -> Result<()> {
        sqlx::query(
            "INSERT INTO found_items (id, finder_id, cooperative_id, category, title, \
             description, location_area, found_date, keywords, image_urls, status, \
             source, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(item.id)
        .bind(item.finder_id)
        .bind(item.cooperative_id)
        .bind(item.category.to_string())
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.location_area)
        .bind(item.found_date)
        .bind(&item.keywords)
        .bind(&item.image_urls)
        .bind(item.status.to_string())
        .bind(item.source.to_string())
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn lost_by_id(&self, id: Uuid) -> Result<Option<LostItem>> {
        let row = sqlx::query_as::<_, LostItemRow>("SELECT * FROM lost_items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(LostItem::try_from).transpose()
    }

    async fn found_by_id(&self, id: Uuid) -> Result<Option<FoundItem>> {
        let row = sqlx::query_as::<_, FoundItemRow>("SELECT * FROM found_items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(FoundItem::try_from).transpose()
    }

    async fn lost_by_owner(&self, owner_id: Uuid) -> Result<Vec<LostItem>> {
        let rows = sqlx::query_as::<_, LostItemRow>(
            "SELECT * FROM lost_items WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(LostItem::try_from).collect()
    }

    async fn found_by_finder(&self, finder_id: Uuid) -> Result<Vec<FoundItem>> {
        let rows = sqlx::query_as::<_, FoundItemRow>(
            "SELECT * FROM found_items WHERE finder_id = $1 ORDER BY created_at DESC",
        )
        .bind(finder_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(FoundItem::try_from).collect()
    }

    async fn update_lost_text(
        &self,
        id: Uuid,
        title: &str,
        description: &str,
        keywords: &[String],
    ) -> Result<()> {
        sqlx::query(
            "UPDATE lost_items SET title = $2, description = $3, keywords = $4, updated_at = $5 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(title)
        .bind(description)
        .bind(keywords)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn found_candidates(
        &self,
        category: Category,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<FoundItem>> {
        let rows = sqlx::query_as::<_, FoundItemRow>(
            "SELECT * FROM found_items \
             WHERE category = $1 AND status = 'unclaimed' \
               AND found_date BETWEEN $2 AND $3 \
             ORDER BY found_date DESC LIMIT $4",
        )
        .bind(category.to_string())
        .bind(window_start)
        .bind(window_end)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(FoundItem::try_from).collect()
    }

    async fn lost_candidates(
        &self,
        category: Category,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<LostItem>> {
        let rows = sqlx::query_as::<_, LostItemRow>(
            "SELECT * FROM lost_items \
             WHERE category = $1 AND status = 'active' \
               AND lost_date BETWEEN $2 AND $3 \
             ORDER BY lost_date DESC LIMIT $4",
        )
        .bind(category.to_string())
        .bind(window_start)
        .bind(window_end)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(LostItem::try_from).collect()
    }

    async fn recent_active_lost(&self, category: Category, limit: i64) -> Result<Vec<LostItem>> {
        let rows = sqlx::query_as::<_, LostItemRow>(
            "SELECT * FROM lost_items \
             WHERE category = $1 AND status = 'active' \
             ORDER BY updated_at DESC LIMIT $2",
        )
        .bind(category.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(LostItem::try_from).collect()
    }

    async fn expire_stale_items(&self, cutoff: DateTime<Utc>, batch: i64) -> Result<u64> {
        let now = Utc::now();

        // Two bounded statements, no long-lived locks.
        let lost = sqlx::query(
            "UPDATE lost_items SET status = 'expired', updated_at = $2 \
             WHERE id IN (SELECT id FROM lost_items \
                          WHERE status = 'active' AND updated_at < $1 LIMIT $3)",
        )
        .bind(cutoff)
        .bind(now)
        .bind(batch)
        .execute(&self.pool)
        .await?;

        let found = sqlx::query(
            "UPDATE found_items SET status = 'expired', updated_at = $2 \
             WHERE id IN (SELECT id FROM found_items \
                          WHERE status = 'unclaimed' AND updated_at < $1 LIMIT $3)",
        )
        .bind(cutoff)
        .bind(now)
        .bind(batch)
        .execute(&self.pool)
        .await?;

        Ok(lost.rows_affected() + found.rows_affected())
    }
}

#[async_trait]
impl SecretStore for PgStore {
    async fn insert_secrets(&self, rows: &[SecretQuestion]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for row in rows {
            sqlx::query(
                "INSERT INTO secret_questions (id, lost_item_id, position, question, salt, answer_hash) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(row.id)
            .bind(row.lost_item_id)
            .bind(row.position)
            .bind(&row.question)
            .bind(&row.salt)
            .bind(&row.answer_hash)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn secrets_for(&self, lost_item_id: Uuid) -> Result<Vec<SecretQuestion>> {
        let rows = sqlx::query_as::<_, SecretQuestionRow>(
            "SELECT * FROM secret_questions WHERE lost_item_id = $1 ORDER BY position",
        )
        .bind(lost_item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(SecretQuestion::from).collect())
    }
}
