//! Scam reports and moderation.
//!
//! Filing a report applies the "scam reported" delta to the accused
//! immediately; the admin ruling later applies the confirming or
//! compensating delta. Message content runs through the payment+conditional
//! heuristic at ingest — a flag for the moderation queue, never a gate.

use chrono::Utc;
use uuid::Uuid;

use byaboneka_core::error::DomainError;
use byaboneka_core::fraud::is_suspicious_message;
use byaboneka_core::trust::TrustReason;
use byaboneka_core::types::*;
use byaboneka_core::validation;

use crate::fraud::FraudGate;
use crate::trust::TrustService;
use crate::{audit, store_err, Actor, DynStore};

#[derive(Clone)]
pub struct ReportService {
    store: DynStore,
    fraud: FraudGate,
    trust: TrustService,
}

impl ReportService {
    pub fn new(store: DynStore, fraud: FraudGate, trust: TrustService) -> Self {
        Self {
            store,
            fraud,
            trust,
        }
    }

    pub async fn report_scam(
        &self,
        actor: &Actor,
        reported_user_id: Uuid,
        claim_id: Option<Uuid>,
        message_excerpt: String,
    ) -> Result<ScamReport, DomainError> {
        validation::validate_non_empty(&message_excerpt, "message_excerpt")
            .map_err(DomainError::invalid)?;
        if reported_user_id == actor.id() {
            return Err(DomainError::invalid("You cannot report yourself"));
        }
        self.store
            .user_by_id(reported_user_id)
            .await
            .map_err(store_err)?
            .ok_or(DomainError::NotFound("user"))?;

        self.fraud.check(actor, ActionKind::ScamReport).await?;

        let report = ScamReport {
            id: Uuid::new_v4(),
            reporter_id: actor.id(),
            reported_user_id,
            claim_id,
            flagged: is_suspicious_message(&message_excerpt),
            message_excerpt,
            status: ReportStatus::Open,
            resolved_by: None,
            created_at: Utc::now(),
            resolved_at: None,
        };
        self.store.insert_report(&report).await.map_err(store_err)?;

        // Being reported costs trust up front; the ruling settles the rest.
        self.trust
            .apply(reported_user_id, TrustReason::ScamReported)
            .await?;

        self.fraud.record(actor, ActionKind::ScamReport).await?;
        audit(
            &self.store,
            Some(actor.id()),
            "scam_reported",
            "user",
            Some(reported_user_id),
            serde_json::json!({ "report": report.id, "flagged": report.flagged }),
        )
        .await;

        Ok(report)
    }

    pub async fn open_reports(&self, admin: &Actor, limit: i64) -> Result<Vec<ScamReport>, DomainError> {
        require_admin(admin)?;
        self.store.open_reports(limit).await.map_err(store_err)
    }

    /// Admin ruling on an open report.
    pub async fn resolve(
        &self,
        admin: &Actor,
        report_id: Uuid,
        outcome: ReportStatus,
    ) -> Result<(), DomainError> {
        require_admin(admin)?;
        if outcome == ReportStatus::Open {
            return Err(DomainError::invalid("A ruling cannot leave the report open"));
        }

        let report = self
            .store
            .report_by_id(report_id)
            .await
            .map_err(store_err)?
            .ok_or(DomainError::NotFound("scam report"))?;
        if report.status != ReportStatus::Open {
            return Err(DomainError::conflict("This report is already resolved"));
        }

        self.store
            .resolve_report(report_id, outcome, admin.id(), Utc::now())
            .await
            .map_err(store_err)?;

        match outcome {
            ReportStatus::Confirmed => {
                self.trust
                    .apply(report.reported_user_id, TrustReason::ScamConfirmed)
                    .await?;
                self.trust
                    .apply(report.reporter_id, TrustReason::AccurateReportConfirmed)
                    .await?;
            }
            ReportStatus::DismissedFalse => {
                self.trust
                    .apply(report.reporter_id, TrustReason::FalseScamReport)
                    .await?;
            }
            ReportStatus::DismissedAccurate => {
                self.trust
                    .apply(report.reporter_id, TrustReason::AccurateReportConfirmed)
                    .await?;
            }
            ReportStatus::Open => unreachable!("rejected above"),
        }

        audit(
            &self.store,
            Some(admin.id()),
            "scam_report_resolved",
            "user",
            Some(report.reported_user_id),
            serde_json::json!({ "report": report_id, "outcome": outcome }),
        )
        .await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Admin user moderation
    // ------------------------------------------------------------------

    pub async fn ban_user(
        &self,
        admin: &Actor,
        user_id: Uuid,
        reason: &str,
    ) -> Result<(), DomainError> {
        require_admin(admin)?;
        self.store
            .user_by_id(user_id)
            .await
            .map_err(store_err)?
            .ok_or(DomainError::NotFound("user"))?;
        self.store
            .set_banned(user_id, true, Some(reason))
            .await
            .map_err(store_err)?;
        // A banned account keeps no live sessions.
        self.store
            .revoke_all_refresh(user_id)
            .await
            .map_err(store_err)?;
        audit(
            &self.store,
            Some(admin.id()),
            "user_banned",
            "user",
            Some(user_id),
            serde_json::json!({ "reason": reason }),
        )
        .await;
        Ok(())
    }

    pub async fn unban_user(&self, admin: &Actor, user_id: Uuid) -> Result<(), DomainError> {
        require_admin(admin)?;
        self.store
            .user_by_id(user_id)
            .await
            .map_err(store_err)?
            .ok_or(DomainError::NotFound("user"))?;
        self.store
            .set_banned(user_id, false, None)
            .await
            .map_err(store_err)?;
        audit(
            &self.store,
            Some(admin.id()),
            "user_unbanned",
            "user",
            Some(user_id),
            serde_json::json!({}),
        )
        .await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Audit queries
    // ------------------------------------------------------------------

    pub async fn audit_for(
        &self,
        admin: &Actor,
        entity: &str,
        entity_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AuditEntry>, DomainError> {
        require_admin(admin)?;
        self.store
            .audit_for_entity(entity, entity_id, limit)
            .await
            .map_err(store_err)
    }

    pub async fn recent_audit(
        &self,
        admin: &Actor,
        limit: i64,
    ) -> Result<Vec<AuditEntry>, DomainError> {
        require_admin(admin)?;
        self.store.recent_audit(limit).await.map_err(store_err)
    }
}

fn require_admin(actor: &Actor) -> Result<(), DomainError> {
    if actor.user.role != Role::Admin {
        return Err(DomainError::forbidden("Administrator role required"));
    }
    Ok(())
}
