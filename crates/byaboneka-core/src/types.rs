//! Shared entity and status types.
//!
//! Statuses are closed enums, exhaustively matched everywhere; the snake_case
//! string form produced by `Display`/`FromStr` is the single valid SQL
//! serialization. Adding a variant without updating the match arms is a
//! compile error by construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Roles & categories
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Citizen,
    CoopStaff,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Electronics,
    Documents,
    Keys,
    Wallet,
    Bag,
    Clothing,
    Jewelry,
    Accessories,
    Other,
}

// ============================================================================
// Item statuses
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LostStatus {
    Active,
    Claimed,
    Returned,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoundStatus {
    Unclaimed,
    Matched,
    Returned,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoundSource {
    Citizen,
    Cooperative,
}

// ============================================================================
// Claim lifecycle
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Pending,
    Verified,
    Rejected,
    Returned,
    Disputed,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Passed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeResolution {
    ResolvedOwner,
    ResolvedFinder,
    Dismissed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Open,
    Confirmed,
    DismissedFalse,
    DismissedAccurate,
}

// ============================================================================
// Display / FromStr: the SQL serialization
// ============================================================================

macro_rules! string_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let s = match self {
                    $($ty::$variant => $text),+
                };
                f.write_str(s)
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(format!(
                        concat!("unknown ", stringify!($ty), " value: {}"),
                        other
                    )),
                }
            }
        }
    };
}

string_enum!(Role {
    Citizen => "citizen",
    CoopStaff => "coop_staff",
    Admin => "admin",
});

string_enum!(Category {
    Electronics => "electronics",
    Documents => "documents",
    Keys => "keys",
    Wallet => "wallet",
    Bag => "bag",
    Clothing => "clothing",
    Jewelry => "jewelry",
    Accessories => "accessories",
    Other => "other",
});

string_enum!(LostStatus {
    Active => "active",
    Claimed => "claimed",
    Returned => "returned",
    Expired => "expired",
});

string_enum!(FoundStatus {
    Unclaimed => "unclaimed",
    Matched => "matched",
    Returned => "returned",
    Expired => "expired",
});

string_enum!(FoundSource {
    Citizen => "citizen",
    Cooperative => "cooperative",
});

string_enum!(ClaimStatus {
    Pending => "pending",
    Verified => "verified",
    Rejected => "rejected",
    Returned => "returned",
    Disputed => "disputed",
    Cancelled => "cancelled",
    Expired => "expired",
});

string_enum!(AttemptStatus {
    Passed => "passed",
    Failed => "failed",
});

string_enum!(DisputeResolution {
    ResolvedOwner => "resolved_owner",
    ResolvedFinder => "resolved_finder",
    Dismissed => "dismissed",
});

string_enum!(ReportStatus {
    Open => "open",
    Confirmed => "confirmed",
    DismissedFalse => "dismissed_false",
    DismissedAccurate => "dismissed_accurate",
});

// ============================================================================
// Entities
// ============================================================================

/// A registered user. `trust_score` is a derived column backed by the
/// append-only trust event log; the two must agree at all times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub phone: Option<String>,
    pub display_name: String,
    /// Adaptive-cost salted password hash (PHC string). Never serialized out.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub trust_score: i32,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub cooperative_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LostItem {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub category: Category,
    pub title: String,
    pub description: String,
    pub location_area: String,
    pub lost_date: DateTime<Utc>,
    /// Derived from title+description at insert/update.
    pub keywords: Vec<String>,
    pub status: LostStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoundItem {
    pub id: Uuid,
    pub finder_id: Uuid,
    pub cooperative_id: Option<Uuid>,
    pub category: Category,
    pub title: String,
    pub description: String,
    pub location_area: String,
    pub found_date: DateTime<Utc>,
    pub keywords: Vec<String>,
    /// Capped at 5.
    pub image_urls: Vec<String>,
    pub status: FoundStatus,
    pub source: FoundSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One of exactly three secret questions attached to a lost item.
/// The answer is stored only as `normalize(answer)` hashed with `salt`;
/// neither the salt nor the hash ever leaves the store layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretQuestion {
    pub id: Uuid,
    pub lost_item_id: Uuid,
    /// 0, 1 or 2.
    pub position: i16,
    pub question: String,
    #[serde(skip_serializing, default)]
    pub salt: String,
    #[serde(skip_serializing, default)]
    pub answer_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub id: Uuid,
    pub lost_item_id: Uuid,
    pub found_item_id: Uuid,
    pub claimant_id: Uuid,
    pub status: ClaimStatus,
    /// correct answers / 3 from the latest attempt.
    pub verification_score: f64,
    pub attempts_made: i32,
    pub consecutive_failures: i32,
    /// Cooldown deadline; no attempts may be recorded before this instant.
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only record of a verification attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationAttempt {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub user_id: Uuid,
    pub correct_answers: i16,
    pub status: AttemptStatus,
    pub ip: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Single-use handover code bound to a verified claim. Only the salted
/// adaptive-cost hash of the OTP is stored; the plaintext is returned once
/// to the owner at mint time and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoverConfirmation {
    pub id: Uuid,
    pub claim_id: Uuid,
    #[serde(skip_serializing, default)]
    pub otp_hash: String,
    pub expires_at: DateTime<Utc>,
    pub verified: bool,
    pub attempts: i32,
    pub max_attempts: i32,
    pub redeemed_by: Option<Uuid>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Append-only trust ledger entry. The user's current score must equal the
/// clamped sum of deltas; `new_score` snapshots the post-write value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub delta: i32,
    pub reason: crate::trust::TrustReason,
    pub new_score: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispute {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub opened_by: Uuid,
    pub reason_text: String,
    pub resolution: Option<DisputeResolution>,
    pub resolved_by: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// A user-filed scam report, optionally tied to a claim. `flagged` records
/// whether the message heuristic tripped at ingest time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScamReport {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub reported_user_id: Uuid,
    pub claim_id: Option<Uuid>,
    pub message_excerpt: String,
    pub flagged: bool,
    pub status: ReportStatus,
    pub resolved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Matching cache
// ============================================================================

/// One scored counterpart in a match result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub found_item_id: Uuid,
    pub score: u32,
    pub explanations: Vec<String>,
}

/// Cached match results for one lost item. A read is a cache hit iff
/// `computed_at` is within the freshness window (1 hour).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCacheRow {
    pub lost_item_id: Uuid,
    pub results: Vec<MatchResult>,
    pub computed_at: DateTime<Utc>,
}

// ============================================================================
// Activity & audit
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Login,
    ItemReported,
    ClaimCreated,
    VerificationAttempt,
    HandoverRedeem,
    ScamReport,
    DisputeOpened,
}

string_enum!(ActionKind {
    Login => "login",
    ItemReported => "item_reported",
    ClaimCreated => "claim_created",
    VerificationAttempt => "verification_attempt",
    HandoverRedeem => "handover_redeem",
    ScamReport => "scam_report",
    DisputeOpened => "dispute_opened",
});

/// One row of the per-user action log, feeding velocity and IP counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: ActionKind,
    pub ip: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Append-only audit trail for state-machine actions and admin operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<Uuid>,
    pub detail: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Tokens
// ============================================================================

/// Server-side refresh token record: `(user_id, token_hash, expires_at,
/// revoked_at?)`. The hash is salted; the raw token never touches storage.
#[derive(Debug, Clone)]
pub struct RefreshTokenRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub salt: String,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Single-use password reset token, stored hashed.
#[derive(Debug, Clone)]
pub struct ResetTokenRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            ClaimStatus::Pending,
            ClaimStatus::Verified,
            ClaimStatus::Rejected,
            ClaimStatus::Returned,
            ClaimStatus::Disputed,
            ClaimStatus::Cancelled,
            ClaimStatus::Expired,
        ] {
            let text = status.to_string();
            assert_eq!(text.parse::<ClaimStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!("settling".parse::<ClaimStatus>().is_err());
        assert!("".parse::<LostStatus>().is_err());
    }

    #[test]
    fn test_role_strings_are_snake_case() {
        assert_eq!(Role::CoopStaff.to_string(), "coop_staff");
        assert_eq!("coop_staff".parse::<Role>().unwrap(), Role::CoopStaff);
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@b.rw".into(),
            phone: None,
            display_name: "A".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::Citizen,
            trust_score: 0,
            email_verified: false,
            phone_verified: false,
            is_banned: false,
            ban_reason: None,
            cooperative_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password_hash"));
    }
}
