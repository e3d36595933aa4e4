//! Storage abstractions.
//!
//! Implementations:
//!   • `MemoryStore` (testing/development)
//!   • `PgStore` (production, PostgreSQL)
//!
//! Traits return `anyhow::Result`; the service layer folds failures into
//! `DomainError::TransientStore`. Compound operations exist wherever a state
//! change must land atomically with its side effects (item status flips,
//! attempt rows, redemption stamps) so that every backend can make them a
//! single transaction and the claim service remains the single writer.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::trust::TrustReason;
use crate::types::*;

// ============================================================================
// Users & tokens
// ============================================================================

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<()>;
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Uniqueness probe for registration: email, or phone when given.
    async fn identity_taken(&self, email: &str, phone: Option<&str>) -> Result<bool>;
    async fn set_banned(&self, id: Uuid, banned: bool, reason: Option<&str>) -> Result<()>;
    async fn set_email_verified(&self, id: Uuid) -> Result<()>;
    async fn set_phone_verified(&self, id: Uuid) -> Result<()>;
    async fn set_password_hash(&self, id: Uuid, hash: &str) -> Result<()>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert_refresh(&self, row: &RefreshTokenRow) -> Result<()>;
    async fn refresh_by_id(&self, id: Uuid) -> Result<Option<RefreshTokenRow>>;
    async fn revoke_refresh(&self, id: Uuid) -> Result<()>;
    async fn revoke_all_refresh(&self, user_id: Uuid) -> Result<u64>;

    async fn insert_reset(&self, row: &ResetTokenRow) -> Result<()>;
    /// Atomically fetch-and-consume an unused, unexpired reset token.
    async fn consume_reset(&self, token_hash: &str, now: DateTime<Utc>)
        -> Result<Option<ResetTokenRow>>;
}

// ============================================================================
// Items & secrets
// ============================================================================

#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn insert_lost(&self, item: &LostItem) -> Result<()>;
    async fn insert_found(&self, item: &FoundItem) -> Result<()>;
    async fn lost_by_id(&self, id: Uuid) -> Result<Option<LostItem>>;
    async fn found_by_id(&self, id: Uuid) -> Result<Option<FoundItem>>;
    async fn lost_by_owner(&self, owner_id: Uuid) -> Result<Vec<LostItem>>;
    async fn found_by_finder(&self, finder_id: Uuid) -> Result<Vec<FoundItem>>;
    async fn update_lost_text(
        &self,
        id: Uuid,
        title: &str,
        description: &str,
        keywords: &[String],
    ) -> Result<()>;

    /// Unclaimed found items of this category dated within the window,
    /// newest first, bounded.
    async fn found_candidates(
        &self,
        category: Category,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<FoundItem>>;

    /// Active lost items of this category dated within the window,
    /// newest first, bounded.
    async fn lost_candidates(
        &self,
        category: Category,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<LostItem>>;

    /// Most recently updated active lost items of a category, for the
    /// found-item refresh pass.
    async fn recent_active_lost(&self, category: Category, limit: i64) -> Result<Vec<LostItem>>;

    /// Archive items untouched since the cutoff. Returns rows archived;
    /// bounded per call so the reaper holds no long-lived locks.
    async fn expire_stale_items(&self, cutoff: DateTime<Utc>, batch: i64) -> Result<u64>;
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Insert exactly three rows for a lost item.
    async fn insert_secrets(&self, rows: &[SecretQuestion]) -> Result<()>;
    /// All rows for an item, ordered by position. Salts and hashes included;
    /// callers above the service layer only ever see the question text.
    async fn secrets_for(&self, lost_item_id: Uuid) -> Result<Vec<SecretQuestion>>;
}

// ============================================================================
// Claims
// ============================================================================

#[async_trait]
pub trait ClaimStore: Send + Sync {
    async fn insert_claim(&self, claim: &Claim) -> Result<()>;
    async fn claim_by_id(&self, id: Uuid) -> Result<Option<Claim>>;
    /// True if a claim for this tuple currently blocks a new one.
    async fn live_claim_exists(
        &self,
        lost_item_id: Uuid,
        found_item_id: Uuid,
        claimant_id: Uuid,
    ) -> Result<bool>;
    /// Claims by this user currently in a blocking (non-terminal) state.
    async fn live_claim_count(&self, claimant_id: Uuid) -> Result<i64>;
    /// Attempts recorded for a claim since the given instant.
    async fn attempts_since(&self, claim_id: Uuid, since: DateTime<Utc>) -> Result<i64>;

    /// Pass path, one transaction: append the attempt, set the claim
    /// Verified with its score, flip the lost item to Claimed and the found
    /// item to Matched.
    async fn commit_verification_pass(
        &self,
        claim_id: Uuid,
        attempt: &VerificationAttempt,
        score: f64,
    ) -> Result<()>;

    /// Fail path, one transaction: append the attempt, bump counters, set
    /// the cooldown deadline.
    async fn commit_verification_failure(
        &self,
        claim_id: Uuid,
        attempt: &VerificationAttempt,
        score: f64,
        consecutive_failures: i32,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Cancel, one transaction: set Cancelled and, when the claim was
    /// Verified, revert the item statuses to Active/Unclaimed.
    async fn commit_cancel(&self, claim_id: Uuid, was_verified: bool) -> Result<()>;

    /// Expire pending claims older than the cutoff, bounded. Returns rows
    /// expired.
    async fn expire_stale_claims(&self, cutoff: DateTime<Utc>, batch: i64) -> Result<u64>;

    async fn insert_dispute(&self, dispute: &Dispute) -> Result<()>;
    async fn dispute_by_id(&self, id: Uuid) -> Result<Option<Dispute>>;
    async fn active_dispute_for(&self, claim_id: Uuid) -> Result<Option<Dispute>>;
    /// Mark the claim Disputed and store the dispute row together.
    async fn commit_dispute_open(&self, claim_id: Uuid, dispute: &Dispute) -> Result<()>;
    /// Resolution, one transaction: stamp the dispute, move the claim to its
    /// target state, and align item statuses (Claimed/Matched when the claim
    /// returns to Verified; Active/Unclaimed otherwise).
    async fn commit_dispute_resolution(
        &self,
        dispute_id: Uuid,
        resolution: DisputeResolution,
        resolved_by: Uuid,
        target: ClaimStatus,
        notes: Option<&str>,
    ) -> Result<()>;
}

// ============================================================================
// Handover
// ============================================================================

#[async_trait]
pub trait HandoverStore: Send + Sync {
    async fn insert_confirmation(&self, confirmation: &HandoverConfirmation) -> Result<()>;
    async fn confirmation_for(&self, claim_id: Uuid) -> Result<Option<HandoverConfirmation>>;
    async fn delete_confirmation(&self, id: Uuid) -> Result<()>;
    /// Bump the attempts counter after a mismatch; returns attempts used.
    async fn record_failed_redeem(&self, id: Uuid) -> Result<i32>;

    /// Redemption, one transaction with the claim row locked: mark the
    /// confirmation verified with redeemer and timestamp, move the claim and
    /// both items to Returned. Returns `false`, mutating nothing, when the
    /// confirmation was already verified; errors are transport failures.
    async fn commit_redeem(
        &self,
        claim_id: Uuid,
        confirmation_id: Uuid,
        redeemed_by: Uuid,
        redeemed_at: DateTime<Utc>,
    ) -> Result<bool>;
}

// ============================================================================
// Trust ledger
// ============================================================================

#[async_trait]
pub trait TrustStore: Send + Sync {
    /// Append one ledger event and update the materialized score in the same
    /// transaction, serialized per user by locking the user row. When the
    /// write crosses the auto-ban floor the ban lands in the same
    /// transaction. Returns the stored event.
    async fn append_trust_event(
        &self,
        user_id: Uuid,
        reason: TrustReason,
    ) -> Result<TrustEvent>;

    async fn trust_events_for(&self, user_id: Uuid) -> Result<Vec<TrustEvent>>;
}

// ============================================================================
// Matching cache
// ============================================================================

#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn cache_get(&self, lost_item_id: Uuid) -> Result<Option<MatchCacheRow>>;
    /// Replace the cache row for a lost item atomically.
    async fn cache_put(&self, row: &MatchCacheRow) -> Result<()>;
}

// ============================================================================
// Activity, reports & audit
// ============================================================================

#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn log_action(&self, entry: &ActionLogEntry) -> Result<()>;
    async fn actions_since(
        &self,
        user_id: Uuid,
        kind: Option<ActionKind>,
        since: DateTime<Utc>,
    ) -> Result<i64>;
    /// Failed verification attempts by this user since the instant.
    async fn failed_attempts_since(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<i64>;
    /// Distinct lost items this user failed against since the instant.
    async fn distinct_failed_items_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64>;
    /// Other accounts acting from this IP since the instant.
    async fn accounts_on_ip_since(
        &self,
        ip: &str,
        excluding: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64>;
    /// True if this user has ever acted from this IP.
    async fn ip_seen_for_user(&self, user_id: Uuid, ip: &str) -> Result<bool>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn insert_report(&self, report: &ScamReport) -> Result<()>;
    async fn report_by_id(&self, id: Uuid) -> Result<Option<ScamReport>>;
    async fn open_reports(&self, limit: i64) -> Result<Vec<ScamReport>>;
    async fn resolve_report(
        &self,
        id: Uuid,
        status: ReportStatus,
        resolved_by: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> Result<()>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append_audit(&self, entry: &AuditEntry) -> Result<()>;
    async fn audit_for_entity(&self, entity: &str, entity_id: Uuid, limit: i64)
        -> Result<Vec<AuditEntry>>;
    async fn recent_audit(&self, limit: i64) -> Result<Vec<AuditEntry>>;
}

// ============================================================================
// The full store
// ============================================================================

/// Everything the service layer needs, as one object-safe bound.
pub trait Store:
    UserStore
    + TokenStore
    + ItemStore
    + SecretStore
    + ClaimStore
    + HandoverStore
    + TrustStore
    + MatchStore
    + ActivityStore
    + ReportStore
    + AuditStore
{
}

impl<T> Store for T where
    T: UserStore
        + TokenStore
        + ItemStore
        + SecretStore
        + ClaimStore
        + HandoverStore
        + TrustStore
        + MatchStore
        + ActivityStore
        + ReportStore
        + AuditStore
{
}
