//! sqlx row structs and their conversions into domain entities.
//!
//! Enum columns are TEXT; parsing goes through the domain `FromStr` impls so
//! an unknown value in the database is a loud error, never a silent default.

use anyhow::{anyhow, Result};
use byaboneka_core::trust::TrustReason;
use byaboneka_core::types::*;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

fn parse<T: std::str::FromStr<Err = String>>(value: &str) -> Result<T> {
    value.parse::<T>().map_err(|e| anyhow!(e))
}

#[derive(FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub phone: Option<String>,
    pub display_name: String,
    pub password_hash: String,
    pub role: String,
    pub trust_score: i32,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub cooperative_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: row.id,
            email: row.email,
            phone: row.phone,
            display_name: row.display_name,
            password_hash: row.password_hash,
            role: parse(&row.role)?,
            trust_score: row.trust_score,
            email_verified: row.email_verified,
            phone_verified: row.phone_verified,
            is_banned: row.is_banned,
            ban_reason: row.ban_reason,
            cooperative_id: row.cooperative_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
pub struct LostItemRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub category: String,
    pub title: String,
    pub description: String,
    pub location_area: String,
    pub lost_date: DateTime<Utc>,
    pub keywords: Vec<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<LostItemRow> for LostItem {
    type Error = anyhow::Error;

    fn try_from(row: LostItemRow) -> Result<Self> {
        Ok(LostItem {
            id: row.id,
            owner_id: row.owner_id,
            category: parse(&row.category)?,
            title: row.title,
            description: row.description,
            location_area: row.location_area,
            lost_date: row.lost_date,
            keywords: row.keywords,
            status: parse(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
pub struct FoundItemRow {
    pub id: Uuid,
    pub finder_id: Uuid,
    pub cooperative_id: Option<Uuid>,
    pub category: String,
    pub title: String,
    pub description: String,
    pub location_area: String,
    pub found_date: DateTime<Utc>,
    pub keywords: Vec<String>,
    pub image_urls: Vec<String>,
    pub status: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<FoundItemRow> for FoundItem {
    type Error = anyhow::Error;

    fn try_from(row: FoundItemRow) -> Result<Self> {
        Ok(FoundItem {
            id: row.id,
            finder_id: row.finder_id,
            cooperative_id: row.cooperative_id,
            category: parse(&row.category)?,
            title: row.title,
            description: row.description,
            location_area: row.location_area,
            found_date: row.found_date,
            keywords: row.keywords,
            image_urls: row.image_urls,
            status: parse(&row.status)?,
            source: parse(&row.source)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
pub struct SecretQuestionRow {
    pub id: Uuid,
    pub lost_item_id: Uuid,
    pub position: i16,
    pub question: String,
    pub salt: String,
    pub answer_hash: String,
}

impl From<SecretQuestionRow> for SecretQuestion {
    fn from(row: SecretQuestionRow) -> Self {
        SecretQuestion {
            id: row.id,
            lost_item_id: row.lost_item_id,
            position: row.position,
            question: row.question,
            salt: row.salt,
            answer_hash: row.answer_hash,
        }
    }
}

#[derive(FromRow)]
pub struct ClaimRow {
    pub id: Uuid,
    pub lost_item_id: Uuid,
    pub found_item_id: Uuid,
    pub claimant_id: Uuid,
    pub status: String,
    pub verification_score: f64,
    pub attempts_made: i32,
    pub consecutive_failures: i32,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ClaimRow> for Claim {
    type Error = anyhow::Error;

    fn try_from(row: ClaimRow) -> Result<Self> {
        Ok(Claim {
            id: row.id,
            lost_item_id: row.lost_item_id,
            found_item_id: row.found_item_id,
            claimant_id: row.claimant_id,
            status: parse(&row.status)?,
            verification_score: row.verification_score,
            attempts_made: row.attempts_made,
            consecutive_failures: row.consecutive_failures,
            next_attempt_at: row.next_attempt_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
pub struct HandoverRow {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub otp_hash: String,
    pub expires_at: DateTime<Utc>,
    pub verified: bool,
    pub attempts: i32,
    pub max_attempts: i32,
    pub redeemed_by: Option<Uuid>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<HandoverRow> for HandoverConfirmation {
    fn from(row: HandoverRow) -> Self {
        HandoverConfirmation {
            id: row.id,
            claim_id: row.claim_id,
            otp_hash: row.otp_hash,
            expires_at: row.expires_at,
            verified: row.verified,
            attempts: row.attempts,
            max_attempts: row.max_attempts,
            redeemed_by: row.redeemed_by,
            redeemed_at: row.redeemed_at,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
pub struct TrustEventRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub delta: i32,
    pub reason: String,
    pub new_score: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<TrustEventRow> for TrustEvent {
    type Error = anyhow::Error;

    fn try_from(row: TrustEventRow) -> Result<Self> {
        Ok(TrustEvent {
            id: row.id,
            user_id: row.user_id,
            delta: row.delta,
            reason: row.reason.parse::<TrustReason>().map_err(|e| anyhow!(e))?,
            new_score: row.new_score,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
pub struct DisputeRow {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub opened_by: Uuid,
    pub reason_text: String,
    pub resolution: Option<String>,
    pub resolved_by: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<DisputeRow> for Dispute {
    type Error = anyhow::Error;

    fn try_from(row: DisputeRow) -> Result<Self> {
        Ok(Dispute {
            id: row.id,
            claim_id: row.claim_id,
            opened_by: row.opened_by,
            reason_text: row.reason_text,
            resolution: row.resolution.as_deref().map(parse).transpose()?,
            resolved_by: row.resolved_by,
            notes: row.notes,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
        })
    }
}

#[derive(FromRow)]
pub struct ScamReportRow {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub reported_user_id: Uuid,
    pub claim_id: Option<Uuid>,
    pub message_excerpt: String,
    pub flagged: bool,
    pub status: String,
    pub resolved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<ScamReportRow> for ScamReport {
    type Error = anyhow::Error;

    fn try_from(row: ScamReportRow) -> Result<Self> {
        Ok(ScamReport {
            id: row.id,
            reporter_id: row.reporter_id,
            reported_user_id: row.reported_user_id,
            claim_id: row.claim_id,
            message_excerpt: row.message_excerpt,
            flagged: row.flagged,
            status: parse(&row.status)?,
            resolved_by: row.resolved_by,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
        })
    }
}

#[derive(FromRow)]
pub struct MatchCacheDbRow {
    pub lost_item_id: Uuid,
    pub results: serde_json::Value,
    pub computed_at: DateTime<Utc>,
}

impl TryFrom<MatchCacheDbRow> for MatchCacheRow {
    type Error = anyhow::Error;

    fn try_from(row: MatchCacheDbRow) -> Result<Self> {
        Ok(MatchCacheRow {
            lost_item_id: row.lost_item_id,
            results: serde_json::from_value(row.results)?,
            computed_at: row.computed_at,
        })
    }
}

#[derive(FromRow)]
pub struct AuditRow {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<Uuid>,
    pub detail: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<AuditRow> for AuditEntry {
    fn from(row: AuditRow) -> Self {
        AuditEntry {
            id: row.id,
            actor_id: row.actor_id,
            action: row.action,
            entity: row.entity,
            entity_id: row.entity_id,
            detail: row.detail,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
pub struct RefreshRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub salt: String,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<RefreshRow> for RefreshTokenRow {
    fn from(row: RefreshRow) -> Self {
        RefreshTokenRow {
            id: row.id,
            user_id: row.user_id,
            token_hash: row.token_hash,
            salt: row.salt,
            expires_at: row.expires_at,
            revoked_at: row.revoked_at,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
pub struct ResetRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ResetRow> for ResetTokenRow {
    fn from(row: ResetRow) -> Self {
        ResetTokenRow {
            id: row.id,
            user_id: row.user_id,
            token_hash: row.token_hash,
            expires_at: row.expires_at,
            used_at: row.used_at,
            created_at: row.created_at,
        }
    }
}
