//! Trust ledger service.
//!
//! All trust writes in the system go through [`TrustService::apply`]; the
//! store serializes them per user and lands the auto-ban in the same
//! transaction. The admin recompute replays the ledger and asserts it still
//! matches the materialized score.

use byaboneka_core::error::DomainError;
use byaboneka_core::trust::{self, TrustReason};
use byaboneka_core::types::TrustEvent;
use serde::Serialize;
use uuid::Uuid;

use crate::{audit, store_err, DynStore};

#[derive(Clone)]
pub struct TrustService {
    store: DynStore,
}

#[derive(Debug, Serialize)]
pub struct RecomputeReport {
    pub user_id: Uuid,
    pub stored_score: i32,
    pub recomputed_score: i32,
    pub event_count: usize,
    pub consistent: bool,
}

impl TrustService {
    pub fn new(store: DynStore) -> Self {
        Self { store }
    }

    /// Append one ledger event. The caller names the reason; the delta comes
    /// from the authoritative table.
    pub async fn apply(
        &self,
        user_id: Uuid,
        reason: TrustReason,
    ) -> Result<TrustEvent, DomainError> {
        let event = self
            .store
            .append_trust_event(user_id, reason)
            .await
            .map_err(store_err)?;

        tracing::debug!(
            user = %user_id,
            reason = %reason,
            delta = event.delta,
            new_score = event.new_score,
            "trust event applied"
        );
        Ok(event)
    }

    /// Replay the full ledger for a user and compare against the stored
    /// score. Inconsistency is reported, logged, and left for the operator;
    /// this operation never rewrites history.
    pub async fn recompute(
        &self,
        admin_id: Uuid,
        user_id: Uuid,
    ) -> Result<RecomputeReport, DomainError> {
        let user = self
            .store
            .user_by_id(user_id)
            .await
            .map_err(store_err)?
            .ok_or(DomainError::NotFound("user"))?;

        let events = self
            .store
            .trust_events_for(user_id)
            .await
            .map_err(store_err)?;
        let recomputed = trust::recompute(events.iter().map(|e| e.delta));

        let report = RecomputeReport {
            user_id,
            stored_score: user.trust_score,
            recomputed_score: recomputed,
            event_count: events.len(),
            consistent: recomputed == user.trust_score,
        };

        if !report.consistent {
            tracing::error!(
                user = %user_id,
                stored = report.stored_score,
                recomputed = report.recomputed_score,
                "trust ledger does not match materialized score"
            );
        }

        audit(
            &self.store,
            Some(admin_id),
            "trust_recompute",
            "user",
            Some(user_id),
            serde_json::json!({
                "stored": report.stored_score,
                "recomputed": report.recomputed_score,
                "consistent": report.consistent,
            }),
        )
        .await;

        Ok(report)
    }
}
