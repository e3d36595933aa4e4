//! MatchStore on PostgreSQL.

use anyhow::Result;
use async_trait::async_trait;
use byaboneka_core::store::MatchStore;
use byaboneka_core::types::MatchCacheRow;
use uuid::Uuid;

use super::PgStore;
use crate::rows::MatchCacheDbRow;

#[async_trait]
impl MatchStore for PgStore {
    async fn cache_get(&self, lost_item_id: Uuid) -> Result<Option<MatchCacheRow>> {
        let row = sqlx::query_as::<_, MatchCacheDbRow>(
            "SELECT * FROM match_results WHERE lost_item_id = $1",
        )
        .bind(lost_item_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(MatchCacheRow::try_from).transpose()
    }

    async fn cache_put(&self, row: &MatchCacheRow) -> Result<()> {
        // One row per lost item, replaced atomically.
        sqlx::query(
            "INSERT INTO match_results (lost_item_id, results, computed_at) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (lost_item_id) \
             DO UPDATE SET results = EXCLUDED.results, computed_at = EXCLUDED.computed_at",
        )
        .bind(row.lost_item_id)
        .bind(serde_json::to_value(&row.results)?)
        .bind(row.computed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
