//! Matching service.
//!
//! Wraps the pure scorer with candidate retrieval and the TTL cache. Cached
//! results are advisory: a stale row is served only after a failed
//! recompute, a missing row triggers synchronous recomputation, and no state
//! transition anywhere depends on them.

use chrono::{Duration, Utc};
use uuid::Uuid;

use byaboneka_core::error::DomainError;
use byaboneka_core::matching::{
    score_pair, MatchScore, CACHE_TTL_SECS, CANDIDATE_WINDOW_DAYS, FOUND_REFRESH_LIMIT,
    MAX_CANDIDATES, MAX_RESULTS, MIN_MATCH_SCORE,
};
use byaboneka_core::types::{FoundItem, LostItem, MatchCacheRow, MatchResult};

use crate::notify::Notifier;
use crate::{store_err, Actor, DynStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct MatchingService {
    store: DynStore,
    notifier: Arc<dyn Notifier>,
}

/// A scored counterpart for a found item (not cached; computed on read).
#[derive(Debug, Clone, serde::Serialize)]
pub struct FoundMatch {
    pub lost_item_id: Uuid,
    pub score: u32,
    pub explanations: Vec<String>,
}

impl MatchingService {
    pub fn new(store: DynStore, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Match results for a lost item, owner-only. Serves the cache when the
    /// row is stamped within the TTL, otherwise recomputes synchronously.
    pub async fn matches_for_lost(
        &self,
        actor: &Actor,
        lost_item_id: Uuid,
    ) -> Result<Vec<MatchResult>, DomainError> {
        let lost = self
            .store
            .lost_by_id(lost_item_id)
            .await
            .map_err(store_err)?
            .ok_or(DomainError::NotFound("lost item"))?;
        if lost.owner_id != actor.id() {
            return Err(DomainError::forbidden(
                "Only the owner may view matches for this item",
            ));
        }

        let cached = self
            .store
            .cache_get(lost_item_id)
            .await
            .map_err(store_err)?;
        if let Some(row) = &cached {
            let age = Utc::now() - row.computed_at;
            if age < Duration::seconds(CACHE_TTL_SECS) {
                return Ok(row.results.clone());
            }
        }

        match self.recompute_for_lost(&lost).await {
            Ok(results) => Ok(results),
            // A stale answer beats no answer; the cache is advisory.
            Err(err) => match cached {
                Some(row) => {
                    tracing::warn!(lost_item = %lost_item_id, error = %err, "match recompute failed, serving stale cache");
                    Ok(row.results)
                }
                None => Err(store_err(err)),
            },
        }
    }

    /// Counterparts for a found item, finder-only; computed on demand.
    pub async fn matches_for_found(
        &self,
        actor: &Actor,
        found_item_id: Uuid,
    ) -> Result<Vec<FoundMatch>, DomainError> {
        let found = self
            .store
            .found_by_id(found_item_id)
            .await
            .map_err(store_err)?
            .ok_or(DomainError::NotFound("found item"))?;
        if found.finder_id != actor.id() {
            return Err(DomainError::forbidden(
                "Only the finder may view matches for this item",
            ));
        }

        let window = Duration::days(CANDIDATE_WINDOW_DAYS);
        let candidates = self
            .store
            .lost_candidates(
                found.category,
                found.found_date - window,
                found.found_date + window,
                MAX_CANDIDATES,
            )
            .await
            .map_err(store_err)?;

        let mut scored: Vec<(LostItem, MatchScore)> = candidates
            .into_iter()
            .map(|lost| {
                let score = score_pair(&lost, &found);
                (lost, score)
            })
            .filter(|(_, s)| s.score >= MIN_MATCH_SCORE)
            .collect();
        scored.sort_by(|a, b| b.1.score.cmp(&a.1.score));
        scored.truncate(MAX_RESULTS);

        Ok(scored
            .into_iter()
            .map(|(lost, score)| FoundMatch {
                lost_item_id: lost.id,
                score: score.score,
                explanations: score.explanations,
            })
            .collect())
    }

    /// Recompute and replace the cache row for one lost item.
    pub async fn recompute_for_lost(
        &self,
        lost: &LostItem,
    ) -> anyhow::Result<Vec<MatchResult>> {
        let window = Duration::days(CANDIDATE_WINDOW_DAYS);
        let candidates = self
            .store
            .found_candidates(
                lost.category,
                lost.lost_date - window,
                lost.lost_date + window,
                MAX_CANDIDATES,
            )
            .await?;

        let mut scored: Vec<(FoundItem, MatchScore)> = candidates
            .into_iter()
            .map(|found| {
                let score = score_pair(lost, &found);
                (found, score)
            })
            .filter(|(_, s)| s.score >= MIN_MATCH_SCORE)
            .collect();
        scored.sort_by(|a, b| b.1.score.cmp(&a.1.score));
        scored.truncate(MAX_RESULTS);

        let results: Vec<MatchResult> = scored
            .into_iter()
            .map(|(found, score)| MatchResult {
                found_item_id: found.id,
                score: score.score,
                explanations: score.explanations,
            })
            .collect();

        self.store
            .cache_put(&MatchCacheRow {
                lost_item_id: lost.id,
                results: results.clone(),
                computed_at: Utc::now(),
            })
            .await?;

        if !results.is_empty() {
            self.notifier
                .match_found(lost.owner_id, lost, results.len())
                .await;
        }

        Ok(results)
    }

    /// Background job body for a newly published lost item.
    pub async fn refresh_lost(&self, lost_item_id: Uuid) -> anyhow::Result<()> {
        if let Some(lost) = self.store.lost_by_id(lost_item_id).await? {
            self.recompute_for_lost(&lost).await?;
        }
        Ok(())
    }

    /// Background job body for a newly published found item: refresh the
    /// caches of recent lost items in the same category.
    pub async fn refresh_for_found(&self, found_item_id: Uuid) -> anyhow::Result<()> {
        let found = match self.store.found_by_id(found_item_id).await? {
            Some(found) => found,
            None => return Ok(()),
        };

        let recents = self
            .store
            .recent_active_lost(found.category, FOUND_REFRESH_LIMIT)
            .await?;
        for lost in recents {
            self.recompute_for_lost(&lost).await?;
        }
        Ok(())
    }
}
