//! OTP handover service.
//!
//! The owner mints a single-use 6-digit code against a verified claim; only
//! the finder (or staff of the finder's cooperative) can redeem it. The
//! plaintext code exists exactly once, in the mint response. Redemption is
//! the only path to Returned.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use byaboneka_core::error::DomainError;
use byaboneka_core::otp;
use byaboneka_core::trust::TrustReason;
use byaboneka_core::types::*;
use byaboneka_core::validation::validate_otp_shape;

use crate::fraud::FraudGate;
use crate::notify::Notifier;
use crate::trust::TrustService;
use crate::{audit, store_err, Actor, DynStore};

pub const OWNER_REDEEM_MESSAGE: &str =
    "The item owner cannot confirm their own handover; the finder enters the code";

#[derive(Clone)]
pub struct HandoverService {
    store: DynStore,
    fraud: FraudGate,
    trust: TrustService,
    notifier: Arc<dyn Notifier>,
}

/// Mint response: the only place the plaintext code ever appears.
#[derive(Debug, Serialize)]
pub struct MintedOtp {
    pub otp: String,
    pub expires_at: DateTime<Utc>,
}

/// Redacted view for the status endpoint.
#[derive(Debug, Serialize)]
pub struct HandoverStatus {
    pub exists: bool,
    pub verified: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub max_attempts: i32,
}

impl HandoverService {
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
    // Mint
    // ------------------------------------------------------------------

    pub async fn mint(&self, actor: &Actor, claim_id: Uuid) -> Result<MintedOtp, DomainError> {
        let claim = self.load_claim(claim_id).await?;
        if claim.claimant_id != actor.id() {
            return Err(DomainError::forbidden(
                "Only the item owner may mint a handover code",
            ));
        }
        if claim.status != ClaimStatus::Verified {
            return Err(DomainError::conflict(
                "Handover codes require a verified claim",
            ));
        }

        let now = Utc::now();
        if let Some(existing) = self
            .store
            .confirmation_for(claim_id)
            .await
            .map_err(store_err)?
        {
            if existing.verified {
                return Err(DomainError::conflict("This handover is already complete"));
            }
            if existing.expires_at > now {
                return Err(DomainError::conflict(
                    "A handover code is already active for this claim",
                ));
            }
            // Expired and never verified: delete, then mint fresh.
            self.store
                .delete_confirmation(existing.id)
                .await
                .map_err(store_err)?;
        }

        let code = otp::generate_code();
        let confirmation = HandoverConfirmation {
            id: Uuid::new_v4(),
            claim_id,
            otp_hash: otp::hash_code(&code)?,
            expires_at: now + otp::otp_ttl(),
            verified: false,
            attempts: 0,
            max_attempts: otp::OTP_MAX_ATTEMPTS,
            redeemed_by: None,
            redeemed_at: None,
            created_at: now,
        };
        self.store
            .insert_confirmation(&confirmation)
            .await
            .map_err(store_err)?;

        audit(
            &self.store,
            Some(actor.id()),
            "handover_minted",
            "claim",
            Some(claim_id),
            serde_json::json!({ "expires_at": confirmation.expires_at }),
        )
        .await;

        if let Some(found) = self
            .store
            .found_by_id(claim.found_item_id)
            .await
            .map_err(store_err)?
        {
            if let Ok(Some(finder)) = self.store.user_by_id(found.finder_id).await {
                self.notifier.handover_ready(&finder, &found).await;
            }
        }

        Ok(MintedOtp {
            otp: code,
            expires_at: confirmation.expires_at,
        })
    }

    // ------------------------------------------------------------------
    // Redeem
    // ------------------------------------------------------------------

    pub async fn redeem(
        &self,
        actor: &Actor,
        claim_id: Uuid,
        submitted: &str,
    ) -> Result<Claim, DomainError> {
        validate_otp_shape(submitted).map_err(DomainError::invalid)?;

        let claim = self.load_claim(claim_id).await?;
        let found = self
            .store
            .found_by_id(claim.found_item_id)
            .await
            .map_err(store_err)?
            .ok_or(DomainError::NotFound("found item"))?;

        // Role gate first: the owner holding the correct code is still not a
        // valid redeemer, and must learn nothing about the code's state.
        if actor.id() == claim.claimant_id {
            return Err(DomainError::forbidden(OWNER_REDEEM_MESSAGE));
        }
        let is_finder = actor.id() == found.finder_id;
        let is_coop_staff = actor.user.role == Role::CoopStaff
            && actor.user.cooperative_id.is_some()
            && actor.user.cooperative_id == found.cooperative_id;
        if !is_finder && !is_coop_staff {
            return Err(DomainError::forbidden(
                "Only the finder or their cooperative may confirm handover",
            ));
        }

        let confirmation = self
            .store
            .confirmation_for(claim_id)
            .await
            .map_err(store_err)?
            .ok_or(DomainError::NotFound("handover code"))?;

        if confirmation.verified {
            // Terminal: a second success is impossible and mutates nothing.
            return Err(DomainError::conflict("This handover is already complete"));
        }
        let now = Utc::now();
        if confirmation.expires_at <= now {
            return Err(DomainError::Expired(
                "This handover code has expired; ask the owner for a new one".into(),
            ));
        }
        if confirmation.attempts >= confirmation.max_attempts {
            return Err(DomainError::RateLimited {
                message: "This handover code is locked after too many attempts".into(),
                retry_after_secs: None,
            });
        }

        if !otp::verify_code(submitted, &confirmation.otp_hash) {
            let attempts = self
                .store
                .record_failed_redeem(confirmation.id)
                .await
                .map_err(store_err)?;
            let remaining = (confirmation.max_attempts - attempts).max(0);

            audit(
                &self.store,
                Some(actor.id()),
                "handover_redeem_failed",
                "claim",
                Some(claim_id),
                serde_json::json!({ "attempts_remaining": remaining }),
            )
            .await;

            return Err(DomainError::InvalidInput {
                message: format!("Incorrect code, {} attempts remaining", remaining),
                errors: Vec::new(),
            });
        }

        // Match: one durable transaction flips confirmation, claim and both
        // items to their terminal Returned states.
        let committed = self
            .store
            .commit_redeem(claim_id, confirmation.id, actor.id(), now)
            .await
            .map_err(store_err)?;
        if !committed {
            // Raced another redeemer to an already-verified confirmation.
            return Err(DomainError::conflict("This handover is already complete"));
        }

        // Trust deltas ride after the commit, through the ledger.
        self.trust
            .apply(actor.id(), TrustReason::ReturnCompletedFinder)
            .await?;
        self.trust
            .apply(claim.claimant_id, TrustReason::ReturnCompletedOwner)
            .await?;

        self.fraud.record(actor, ActionKind::HandoverRedeem).await?;
        audit(
            &self.store,
            Some(actor.id()),
            "handover_redeemed",
            "claim",
            Some(claim_id),
            serde_json::json!({}),
        )
        .await;

        let claim = self.load_claim(claim_id).await?;
        if let Ok(Some(owner)) = self.store.user_by_id(claim.claimant_id).await {
            self.notifier
                .handover_confirmed(&owner, &actor.user, &claim)
                .await;
        }

        Ok(claim)
    }

    // ------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------

    /// Participant view of the handover, without any code material.
    pub async fn status(
        &self,
        actor: &Actor,
        claim_id: Uuid,
    ) -> Result<HandoverStatus, DomainError> {
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

        Ok(
            match self
                .store
                .confirmation_for(claim_id)
                .await
                .map_err(store_err)?
            {
                Some(confirmation) => HandoverStatus {
                    exists: true,
                    verified: confirmation.verified,
                    expires_at: Some(confirmation.expires_at),
                    attempts: confirmation.attempts,
                    max_attempts: confirmation.max_attempts,
                },
                None => HandoverStatus {
                    exists: false,
                    verified: false,
                    expires_at: None,
                    attempts: 0,
                    max_attempts: otp::OTP_MAX_ATTEMPTS,
                },
            },
        )
    }

    async fn load_claim(&self, claim_id: Uuid) -> Result<Claim, DomainError> {
        self.store
            .claim_by_id(claim_id)
            .await
            .map_err(store_err)?
            .ok_or(DomainError::NotFound("claim"))
    }
}
