//! Notification dispatch.
//!
//! The `Notifier` trait is the thin contract to whatever transport carries
//! user-facing messages (email today). Implementations must be infallible
//! from the caller's point of view: delivery failures are logged inside the
//! implementation and never surfaced, so a dead mail relay cannot change the
//! outcome of a verification or a handover.

use async_trait::async_trait;
use byaboneka_core::types::{Claim, FoundItem, LostItem, User};

#[async_trait]
pub trait Notifier: Send + Sync {
    /// New match results were computed for an owner's lost item.
    async fn match_found(&self, owner_id: uuid::Uuid, lost: &LostItem, results: usize);

    /// A claim was opened against a finder's item.
    async fn claim_opened(&self, finder: &User, claim: &Claim);

    /// A verification attempt concluded.
    async fn verification_result(&self, claimant: &User, claim: &Claim, passed: bool);

    /// The owner minted a handover code; the finder should expect a meeting.
    async fn handover_ready(&self, finder: &User, found: &FoundItem);

    /// Handover confirmed; both sides informed.
    async fn handover_confirmed(&self, owner: &User, finder: &User, claim: &Claim);

    /// A dispute was opened or resolved on a claim.
    async fn dispute_update(&self, claim: &Claim, resolved: bool);

    /// Password reset requested; the token rides in the message body.
    async fn password_reset(&self, user: &User, token: &str);
}

/// Structured-log notifier. Stands in for the mail transport in development
/// and tests; production swaps in an SMTP-backed implementation behind the
/// same trait.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn match_found(&self, owner_id: uuid::Uuid, lost: &LostItem, results: usize) {
        tracing::info!(
            owner = %owner_id,
            lost_item = %lost.id,
            results,
            "notify: match results ready"
        );
    }

    async fn claim_opened(&self, finder: &User, claim: &Claim) {
        tracing::info!(finder = %finder.id, claim = %claim.id, "notify: claim opened");
    }

    async fn verification_result(&self, claimant: &User, claim: &Claim, passed: bool) {
        tracing::info!(
            claimant = %claimant.id,
            claim = %claim.id,
            passed,
            "notify: verification result"
        );
    }

    async fn handover_ready(&self, finder: &User, found: &FoundItem) {
        tracing::info!(finder = %finder.id, found_item = %found.id, "notify: handover ready");
    }

    async fn handover_confirmed(&self, owner: &User, finder: &User, claim: &Claim) {
        tracing::info!(
            owner = %owner.id,
            finder = %finder.id,
            claim = %claim.id,
            "notify: handover confirmed"
        );
    }

    async fn dispute_update(&self, claim: &Claim, resolved: bool) {
        tracing::info!(claim = %claim.id, resolved, "notify: dispute update");
    }

    async fn password_reset(&self, user: &User, _token: &str) {
        // The token itself stays out of the logs.
        tracing::info!(user = %user.id, "notify: password reset requested");
    }
}
