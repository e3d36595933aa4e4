//! Fraud gate.
//!
//! Gathers the behavioral counters for one actor, runs the pure scorer, and
//! either lets the operation proceed or rejects it before any other side
//! effect. Blocked and flagged assessments are logged with every
//! contributing factor.

use byaboneka_core::error::DomainError;
use byaboneka_core::fraud::{self, FraudInput, RiskAssessment};
use byaboneka_core::types::{ActionKind, ActionLogEntry};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{audit, store_err, Actor, DynStore};

#[derive(Clone)]
pub struct FraudGate {
    store: DynStore,
}

impl FraudGate {
    pub fn new(store: DynStore) -> Self {
        Self { store }
    }

    /// Score the actor for one intended action. Returns the assessment on
    /// allow/flag; rejects with `DomainError::Blocked` at the block
    /// threshold, before the caller has touched anything.
    pub async fn check(&self, actor: &Actor, action: ActionKind) -> Result<RiskAssessment, DomainError> {
        let input = self.gather(actor).await.map_err(store_err)?;
        let assessment = fraud::assess(&input);

        if assessment.should_block {
            tracing::warn!(
                user = %actor.id(),
                action = %action,
                score = assessment.score,
                factors = ?assessment.factors,
                "fraud gate blocked operation"
            );
            audit(
                &self.store,
                Some(actor.id()),
                "fraud_block",
                "user",
                Some(actor.id()),
                serde_json::json!({
                    "action": action.to_string(),
                    "score": assessment.score,
                    "factors": assessment.factors,
                }),
            )
            .await;
            return Err(DomainError::Blocked {
                level: assessment.level,
            });
        }

        if assessment.should_flag {
            tracing::warn!(
                user = %actor.id(),
                action = %action,
                score = assessment.score,
                factors = ?assessment.factors,
                "fraud gate flagged operation for review"
            );
            audit(
                &self.store,
                Some(actor.id()),
                "fraud_flag",
                "user",
                Some(actor.id()),
                serde_json::json!({
                    "action": action.to_string(),
                    "score": assessment.score,
                    "factors": assessment.factors,
                }),
            )
            .await;
        }

        Ok(assessment)
    }

    /// Record a completed action into the velocity/IP counters.
    pub async fn record(&self, actor: &Actor, kind: ActionKind) -> Result<(), DomainError> {
        let entry = ActionLogEntry {
            id: Uuid::new_v4(),
            user_id: actor.id(),
            kind,
            ip: actor.ip.clone(),
            created_at: Utc::now(),
        };
        self.store.log_action(&entry).await.map_err(store_err)
    }

    async fn gather(&self, actor: &Actor) -> anyhow::Result<FraudInput> {
        let now = Utc::now();
        let user = &actor.user;

        let day_ago = now - Duration::hours(24);
        let week_ago = now - Duration::days(7);
        let hour_ago = now - Duration::hours(1);

        let failed_attempts_24h = self
            .store
            .failed_attempts_since(user.id, day_ago)
            .await? as u32;
        let distinct_failed_items_7d = self
            .store
            .distinct_failed_items_since(user.id, week_ago)
            .await? as u32;

        let (accounts_sharing_ip_24h, ip_first_seen) = match actor.ip.as_deref() {
            Some(ip) => (
                self.store.accounts_on_ip_since(ip, user.id, day_ago).await? as u32,
                !self.store.ip_seen_for_user(user.id, ip).await?,
            ),
            None => (0, false),
        };

        let claims_created_last_hour = self
            .store
            .actions_since(user.id, Some(ActionKind::ClaimCreated), hour_ago)
            .await? as u32;
        let reports_last_24h = self
            .store
            .actions_since(user.id, Some(ActionKind::ItemReported), day_ago)
            .await? as u32;
        let actions_last_hour = self.store.actions_since(user.id, None, hour_ago).await? as u32;

        Ok(FraudInput {
            account_age_hours: (now - user.created_at).num_hours(),
            email_verified: user.email_verified,
            phone_verified: user.phone_verified,
            failed_attempts_24h,
            distinct_failed_items_7d,
            accounts_sharing_ip_24h,
            ip_first_seen,
            claims_created_last_hour,
            reports_last_24h,
            actions_last_hour,
            trust_score: user.trust_score,
        })
    }
}
