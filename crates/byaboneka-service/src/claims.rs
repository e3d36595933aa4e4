//! Claim service: the single writer for every claim row.
//!
//! Guards run in a fixed order and the first failure returns a typed error
//! with nothing mutated. The caps and the cooldown are checked **before**
//! any answer comparison so a rejected attempt costs the same time whether
//! or not the claim exists in a verifiable state.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use byaboneka_core::claim::{
    check_transition, cooldown_after, evaluate_answers, in_cooldown, ClaimStatusExt,
    DAILY_ATTEMPT_CAP,
};
use byaboneka_core::error::DomainError;
use byaboneka_core::secrets::verify_answers;
use byaboneka_core::trust::{Tier, TrustReason};
use byaboneka_core::types::*;
use byaboneka_core::validation::SECRET_QUESTION_COUNT;

use crate::fraud::FraudGate;
use crate::notify::Notifier;
use crate::trust::TrustService;
use crate::{audit, store_err, Actor, DynStore};

/// Failures in the trailing 7 days that trigger the pattern penalty.
const REPEAT_FAILURE_THRESHOLD: i64 = 3;

#[derive(Clone)]
pub struct ClaimService {
    store: DynStore,
    fraud: FraudGate,
    trust: TrustService,
    notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Serialize)]
pub struct VerifyOutcome {
    pub passed: bool,
    /// Correct answers out of three.
    pub correct: u8,
    pub verification_score: f64,
    pub next_attempt_at: Option<DateTime<Utc>>,
}

impl ClaimService {
    pub fn new(
        store: DynStore,
        fraud: FraudGate,
        trust: TrustService,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            fraud,
            trust,
            notifier,
        }
    }

    // ------------------------------------------------------------------
    // Open
    // ------------------------------------------------------------------

    pub async fn open_claim(
        &self,
        actor: &Actor,
        lost_item_id: Uuid,
        found_item_id: Uuid,
    ) -> Result<Claim, DomainError> {
        let lost = self
            .store
            .lost_by_id(lost_item_id)
            .await
            .map_err(store_err)?
            .ok_or(DomainError::NotFound("lost item"))?;
        if lost.owner_id != actor.id() {
            return Err(DomainError::forbidden(
                "Only the item owner may claim a match for it",
            ));
        }
        if lost.status != LostStatus::Active {
            return Err(DomainError::conflict("This lost item is not open to claims"));
        }

        let found = self
            .store
            .found_by_id(found_item_id)
            .await
            .map_err(store_err)?
            .ok_or(DomainError::NotFound("found item"))?;
        if found.status != FoundStatus::Unclaimed {
            return Err(DomainError::conflict(
                "This found item is already matched or returned",
            ));
        }

        if self
            .store
            .live_claim_exists(lost_item_id, found_item_id, actor.id())
            .await
            .map_err(store_err)?
        {
            return Err(DomainError::conflict(
                "A claim for this pair is already in progress",
            ));
        }

        // Tier cap on concurrently open claims.
        let tier = Tier::from_score(actor.user.trust_score);
        let open = self
            .store
            .live_claim_count(actor.id())
            .await
            .map_err(store_err)?;
        if open >= tier.claim_cap() as i64 {
            return Err(DomainError::RateLimited {
                message: format!(
                    "Open claim limit reached for your trust tier ({})",
                    tier.claim_cap()
                ),
                retry_after_secs: None,
            });
        }

        self.fraud.check(actor, ActionKind::ClaimCreated).await?;

        let now = Utc::now();
        let claim = Claim {
            id: Uuid::new_v4(),
            lost_item_id,
            found_item_id,
            claimant_id: actor.id(),
            status: ClaimStatus::Pending,
            verification_score: 0.0,
            attempts_made: 0,
            consecutive_failures: 0,
            next_attempt_at: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_claim(&claim).await.map_err(store_err)?;

        self.fraud.record(actor, ActionKind::ClaimCreated).await?;
        audit(
            &self.store,
            Some(actor.id()),
            "claim_opened",
            "claim",
            Some(claim.id),
            serde_json::json!({ "lost": lost_item_id, "found": found_item_id }),
        )
        .await;

        if let Ok(Some(finder)) = self.store.user_by_id(found.finder_id).await {
            self.notifier.claim_opened(&finder, &claim).await;
        }

        Ok(claim)
    }

    // ------------------------------------------------------------------
    // Questions
    // ------------------------------------------------------------------

    /// The claimant reads the questions before answering. Same admission
    /// rules as `verify`, minus the comparison.
    pub async fn questions(
        &self,
        actor: &Actor,
        claim_id: Uuid,
    ) -> Result<Vec<String>, DomainError> {
        let claim = self.load_claim(claim_id).await?;
        self.admit_attempt(actor, &claim, false).await?;

        let secrets = self
            .store
            .secrets_for(claim.lost_item_id)
            .await
            .map_err(store_err)?;
        Ok(secrets.into_iter().map(|q| q.question).collect())
    }

    // ------------------------------------------------------------------
    // Verify
    // ------------------------------------------------------------------

    pub async fn verify(
        &self,
        actor: &Actor,
        claim_id: Uuid,
        answers: Vec<String>,
    ) -> Result<VerifyOutcome, DomainError> {
        let claim = self.load_claim(claim_id).await?;

        // Caps and cooldown come before any answer work.
        self.admit_attempt(actor, &claim, true).await?;
        self.fraud.check(actor, ActionKind::VerificationAttempt).await?;

        if answers.len() != SECRET_QUESTION_COUNT {
            return Err(DomainError::invalid(format!(
                "exactly {} answers are required",
                SECRET_QUESTION_COUNT
            )));
        }

        let secrets = self
            .store
            .secrets_for(claim.lost_item_id)
            .await
            .map_err(store_err)?;
        let bits = verify_answers(&secrets, &answers);
        let outcome = evaluate_answers(&bits);

        let now = Utc::now();
        let attempt = VerificationAttempt {
            id: Uuid::new_v4(),
            claim_id,
            user_id: actor.id(),
            correct_answers: outcome.correct as i16,
            status: if outcome.passed {
                AttemptStatus::Passed
            } else {
                AttemptStatus::Failed
            },
            ip: actor.ip.clone(),
            created_at: now,
        };

        self.fraud
            .record(actor, ActionKind::VerificationAttempt)
            .await?;

        let result = if outcome.passed {
            self.store
                .commit_verification_pass(claim_id, &attempt, outcome.score)
                .await
                .map_err(store_err)?;

            audit(
                &self.store,
                Some(actor.id()),
                "verification_passed",
                "claim",
                Some(claim_id),
                serde_json::json!({ "correct": outcome.correct }),
            )
            .await;

            VerifyOutcome {
                passed: true,
                correct: outcome.correct,
                verification_score: outcome.score,
                next_attempt_at: None,
            }
        } else {
            let failures = claim.consecutive_failures + 1;
            let next_attempt_at = now + cooldown_after(failures);
            self.store
                .commit_verification_failure(
                    claim_id,
                    &attempt,
                    outcome.score,
                    failures,
                    next_attempt_at,
                )
                .await
                .map_err(store_err)?;

            self.trust
                .apply(actor.id(), TrustReason::FailedVerification)
                .await?;

            // Pattern penalty, once per crossing of the 7-day threshold.
            let failed_week = self
                .store
                .failed_attempts_since(actor.id(), now - Duration::days(7))
                .await
                .map_err(store_err)?;
            if failed_week == REPEAT_FAILURE_THRESHOLD {
                self.trust
                    .apply(actor.id(), TrustReason::RepeatedFailedClaims)
                    .await?;
            }

            audit(
                &self.store,
                Some(actor.id()),
                "verification_failed",
                "claim",
                Some(claim_id),
                serde_json::json!({
                    "correct": outcome.correct,
                    "consecutive_failures": failures,
                }),
            )
            .await;

            VerifyOutcome {
                passed: false,
                correct: outcome.correct,
                verification_score: outcome.score,
                next_attempt_at: Some(next_attempt_at),
            }
        };

        if let Ok(Some(claim)) = self.store.claim_by_id(claim_id).await {
            self.notifier
                .verification_result(&actor.user, &claim, result.passed)
                .await;
        }

        Ok(result)
    }

    // ------------------------------------------------------------------
    // Cancel
    // ------------------------------------------------------------------

    pub async fn cancel(&self, actor: &Actor, claim_id: Uuid) -> Result<(), DomainError> {
        let claim = self.load_claim(claim_id).await?;
        if claim.claimant_id != actor.id() {
            return Err(DomainError::forbidden(
                "Only the claimant may cancel this claim",
            ));
        }
        check_transition(claim.status, ClaimStatus::Cancelled)
            .map_err(|e| DomainError::conflict(e.to_string()))?;

        let was_verified = claim.status == ClaimStatus::Verified;
        self.store
            .commit_cancel(claim_id, was_verified)
            .await
            .map_err(store_err)?;

        audit(
            &self.store,
            Some(actor.id()),
            "claim_cancelled",
            "claim",
            Some(claim_id),
            serde_json::json!({ "was_verified": was_verified }),
        )
        .await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Disputes
    // ------------------------------------------------------------------

    pub async fn open_dispute(
        &self,
        actor: &Actor,
        claim_id: Uuid,
        reason_text: String,
    ) -> Result<Dispute, DomainError> {
        if reason_text.trim().is_empty() {
            return Err(DomainError::invalid("A dispute needs a reason"));
        }

        let claim = self.load_claim(claim_id).await?;
        let found = self
            .store
            .found_by_id(claim.found_item_id)
            .await
            .map_err(store_err)?
            .ok_or(DomainError::NotFound("found item"))?;
        let is_participant = actor.id() == claim.claimant_id || actor.id() == found.finder_id;
        if !is_participant {
            return Err(DomainError::forbidden(
                "Only claim participants may open a dispute",
            ));
        }

        check_transition(claim.status, ClaimStatus::Disputed)
            .map_err(|e| DomainError::conflict(e.to_string()))?;

        if self
            .store
            .active_dispute_for(claim_id)
            .await
            .map_err(store_err)?
            .is_some()
        {
            return Err(DomainError::conflict(
                "A dispute is already open on this claim",
            ));
        }

        let dispute = Dispute {
            id: Uuid::new_v4(),
            claim_id,
            opened_by: actor.id(),
            reason_text,
            resolution: None,
            resolved_by: None,
            notes: None,
            created_at: Utc::now(),
            resolved_at: None,
        };
        self.store
            .commit_dispute_open(claim_id, &dispute)
            .await
            .map_err(store_err)?;

        self.fraud.record(actor, ActionKind::DisputeOpened).await?;
        audit(
            &self.store,
            Some(actor.id()),
            "dispute_opened",
            "claim",
            Some(claim_id),
            serde_json::json!({ "dispute": dispute.id }),
        )
        .await;

        if let Ok(Some(claim)) = self.store.claim_by_id(claim_id).await {
            self.notifier.dispute_update(&claim, false).await;
        }

        Ok(dispute)
    }

    /// Operator resolution. Lands the claim in Verified (owner wins),
    /// Rejected (finder wins) or Pending (dismissed), with compensating
    /// trust deltas against the claimant.
    pub async fn resolve_dispute(
        &self,
        admin: &Actor,
        dispute_id: Uuid,
        resolution: DisputeResolution,
        notes: Option<String>,
    ) -> Result<Claim, DomainError> {
        if admin.user.role != Role::Admin {
            return Err(DomainError::forbidden(
                "Only an administrator may resolve disputes",
            ));
        }

        let dispute = self
            .store
            .dispute_by_id(dispute_id)
            .await
            .map_err(store_err)?
            .ok_or(DomainError::NotFound("dispute"))?;
        if dispute.resolution.is_some() {
            return Err(DomainError::conflict("This dispute is already resolved"));
        }

        let claim = self.load_claim(dispute.claim_id).await?;
        let target = match resolution {
            DisputeResolution::ResolvedOwner => ClaimStatus::Verified,
            DisputeResolution::ResolvedFinder => ClaimStatus::Rejected,
            DisputeResolution::Dismissed => ClaimStatus::Pending,
        };
        check_transition(claim.status, target)
            .map_err(|e| DomainError::conflict(e.to_string()))?;

        self.store
            .commit_dispute_resolution(
                dispute_id,
                resolution,
                admin.id(),
                target,
                notes.as_deref(),
            )
            .await
            .map_err(store_err)?;

        // Compensating deltas: the claimant's behavior was either vindicated
        // or flagged by the ruling; a dismissal moves no score.
        match resolution {
            DisputeResolution::ResolvedOwner => {
                self.trust
                    .apply(claim.claimant_id, TrustReason::AccurateReportConfirmed)
                    .await?;
            }
            DisputeResolution::ResolvedFinder => {
                self.trust
                    .apply(claim.claimant_id, TrustReason::ScamReported)
                    .await?;
            }
            DisputeResolution::Dismissed => {}
        }

        audit(
            &self.store,
            Some(admin.id()),
            "dispute_resolved",
            "claim",
            Some(claim.id),
            serde_json::json!({
                "dispute": dispute_id,
                "resolution": resolution,
            }),
        )
        .await;

        let claim = self.load_claim(dispute.claim_id).await?;
        self.notifier.dispute_update(&claim, true).await;
        Ok(claim)
    }

    // ------------------------------------------------------------------
    // Reads & shared guards
    // ------------------------------------------------------------------

    pub async fn get_claim(&self, actor: &Actor, claim_id: Uuid) -> Result<Claim, DomainError> {
        let claim = self.load_claim(claim_id).await?;
        let found = self
            .store
            .found_by_id(claim.found_item_id)
            .await
            .map_err(store_err)?;
        let is_participant = actor.id() == claim.claimant_id
            || found.as_ref().map(|f| f.finder_id) == Some(actor.id())
            || actor.user.role == Role::Admin;
        if !is_participant {
            return Err(DomainError::forbidden("Not a participant in this claim"));
        }
        Ok(claim)
    }

    async fn load_claim(&self, claim_id: Uuid) -> Result<Claim, DomainError> {
        self.store
            .claim_by_id(claim_id)
            .await
            .map_err(store_err)?
            .ok_or(DomainError::NotFound("claim"))
    }

    /// Shared admission rules for question reads and verification attempts:
    /// claimant only, Pending only, under the daily cap. The cooldown binds
    /// attempts, not question reads.
    async fn admit_attempt(
        &self,
        actor: &Actor,
        claim: &Claim,
        enforce_cooldown: bool,
    ) -> Result<(), DomainError> {
        if claim.claimant_id != actor.id() {
            return Err(DomainError::forbidden(
                "Only the claimant may verify this claim",
            ));
        }
        if claim.status != ClaimStatus::Pending {
            if claim.status.is_terminal() {
                return Err(DomainError::conflict("This claim is closed"));
            }
            return Err(DomainError::conflict(
                "This claim is not awaiting verification",
            ));
        }

        let now = Utc::now();
        if enforce_cooldown && in_cooldown(claim.next_attempt_at, now) {
            let until = claim.next_attempt_at.unwrap_or(now);
            return Err(DomainError::Cooldown { until });
        }

        let today = self
            .store
            .attempts_since(claim.id, now - Duration::hours(24))
            .await
            .map_err(store_err)?;
        if today >= DAILY_ATTEMPT_CAP {
            return Err(DomainError::RateLimited {
                message: "Daily verification attempts exhausted for this claim".into(),
                retry_after_secs: Some(24 * 3600),
            });
        }
        Ok(())
    }

    /// Reaper hook: expire pending claims older than the TTL.
    pub async fn expire_stale(&self, cutoff: DateTime<Utc>, batch: i64) -> Result<u64, DomainError> {
        self.store
            .expire_stale_claims(cutoff, batch)
            .await
            .map_err(store_err)
    }
}
