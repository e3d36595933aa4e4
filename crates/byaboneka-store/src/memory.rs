//! In-memory storage for development/testing.
//!
//! This implementation uses a single Mutex-guarded state map for thread-safe
//! access. NOT for production (no persistence, no clustering); its job is to
//! mirror the PostgreSQL semantics closely enough that the service test
//! suites exercise real orchestration logic without a database.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use byaboneka_core::claim::ClaimStatusExt;
use byaboneka_core::store::*;
use byaboneka_core::trust::{self, TrustReason};
use byaboneka_core::types::*;

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    refresh_tokens: HashMap<Uuid, RefreshTokenRow>,
    reset_tokens: Vec<ResetTokenRow>,
    lost_items: HashMap<Uuid, LostItem>,
    found_items: HashMap<Uuid, FoundItem>,
    secrets: Vec<SecretQuestion>,
    claims: HashMap<Uuid, Claim>,
    attempts: Vec<VerificationAttempt>,
    handovers: HashMap<Uuid, HandoverConfirmation>,
    trust_events: Vec<TrustEvent>,
    disputes: HashMap<Uuid, Dispute>,
    match_cache: HashMap<Uuid, MatchCacheRow>,
    actions: Vec<ActionLogEntry>,
    reports: HashMap<Uuid, ScamReport>,
    audit: Vec<AuditEntry>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().expect("memory store poisoned");
        f(&mut state)
    }

    /// Test hook: rewrite a claim row directly (e.g. to backdate it).
    pub fn put_claim(&self, claim: Claim) {
        self.with(|s| {
            s.claims.insert(claim.id, claim);
        })
    }

    /// Test hook: rewrite a handover confirmation directly.
    pub fn put_confirmation(&self, confirmation: HandoverConfirmation) {
        self.with(|s| {
            s.handovers.insert(confirmation.id, confirmation);
        })
    }

    /// Test hook: rewrite a user row directly.
    pub fn put_user(&self, user: User) {
        self.with(|s| {
            s.users.insert(user.id, user);
        })
    }
}

// ============================================================================
// Users & tokens
// ============================================================================

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        self.with(|s| {
            s.users.insert(user.id, user.clone());
        });
        Ok(())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.with(|s| s.users.get(&id).cloned()))
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.with(|s| s.users.values().find(|u| u.email == email).cloned()))
    }

    async fn identity_taken(&self, email: &str, phone: Option<&str>) -> Result<bool> {
        Ok(self.with(|s| {
            s.users.values().any(|u| {
                u.email == email || (phone.is_some() && u.phone.as_deref() == phone)
            })
        }))
    }

    async fn set_banned(&self, id: Uuid, banned: bool, reason: Option<&str>) -> Result<()> {
        self.with(|s| {
            if let Some(user) = s.users.get_mut(&id) {
                user.is_banned = banned;
                user.ban_reason = reason.map(str::to_string);
                user.updated_at = Utc::now();
            }
        });
        Ok(())
    }

    async fn set_email_verified(&self, id: Uuid) -> Result<()> {
        self.with(|s| {
            if let Some(user) = s.users.get_mut(&id) {
                user.email_verified = true;
                user.updated_at = Utc::now();
            }
        });
        Ok(())
    }

    async fn set_phone_verified(&self, id: Uuid) -> Result<()> {
        self.with(|s| {
            if let Some(user) = s.users.get_mut(&id) {
                user.phone_verified = true;
                user.updated_at = Utc::now();
            }
        });
        Ok(())
    }

    async fn set_password_hash(&self, id: Uuid, hash: &str) -> Result<()> {
        self.with(|s| {
            if let Some(user) = s.users.get_mut(&id) {
                user.password_hash = hash.to_string();
                user.updated_at = Utc::now();
            }
        });
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn insert_refresh(&self, row: &RefreshTokenRow) -> Result<()> {
        self.with(|s| {
            s.refresh_tokens.insert(row.id, row.clone());
        });
        Ok(())
    }

    async fn refresh_by_id(&self, id: Uuid) -> Result<Option<RefreshTokenRow>> {
        Ok(self.with(|s| s.refresh_tokens.get(&id).cloned()))
    }

    async fn revoke_refresh(&self, id: Uuid) -> Result<()> {
        self.with(|s| {
            if let Some(row) = s.refresh_tokens.get_mut(&id) {
                if row.revoked_at.is_none() {
                    row.revoked_at = Some(Utc::now());
                }
            }
        });
        Ok(())
    }

    async fn revoke_all_refresh(&self, user_id: Uuid) -> Result<u64> {
        Ok(self.with(|s| {
            let mut revoked = 0;
            for row in s.refresh_tokens.values_mut() {
                if row.user_id == user_id && row.revoked_at.is_none() {
                    row.revoked_at = Some(Utc::now());
                    revoked += 1;
                }
            }
            revoked
        }))
    }

    async fn insert_reset(&self, row: &ResetTokenRow) -> Result<()> {
        self.with(|s| s.reset_tokens.push(row.clone()));
        Ok(())
    }

    async fn consume_reset(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ResetTokenRow>> {
        Ok(self.with(|s| {
            let row = s.reset_tokens.iter_mut().find(|r| {
                r.token_hash == token_hash && r.used_at.is_none() && r.expires_at > now
            })?;
            row.used_at = Some(now);
            Some(row.clone())
        }))
    }
}

// ============================================================================
// Items & secrets
// ============================================================================

#[async_trait]
impl ItemStore for MemoryStore {
    async fn insert_lost(&self, item: &LostItem) -> Result<()> {
        self.with(|s| {
            s.lost_items.insert(item.id, item.clone());
        });
        Ok(())
    }

    async fn insert_found(&self, item: &FoundItem) -> Result<()> {
        self.with(|s| {
            s.found_items.insert(item.id, item.clone());
        });
        Ok(())
    }

    async fn lost_by_id(&self, id: Uuid) -> Result<Option<LostItem>> {
        Ok(self.with(|s| s.lost_items.get(&id).cloned()))
    }

    async fn found_by_id(&self, id: Uuid) -> Result<Option<FoundItem>> {
        Ok(self.with(|s| s.found_items.get(&id).cloned()))
    }

    async fn lost_by_owner(&self, owner_id: Uuid) -> Result<Vec<LostItem>> {
        Ok(self.with(|s| {
            let mut items: Vec<_> = s
                .lost_items
                .values()
                .filter(|i| i.owner_id == owner_id)
                .cloned()
                .collect();
            items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            items
        }))
    }

    async fn found_by_finder(&self, finder_id: Uuid) -> Result<Vec<FoundItem>> {
        Ok(self.with(|s| {
            let mut items: Vec<_> = s
                .found_items
                .values()
                .filter(|i| i.finder_id == finder_id)
                .cloned()
                .collect();
            items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            items
        }))
    }

    async fn update_lost_text(
        &self,
        id: Uuid,
        title: &str,
        description: &str,
        keywords: &[String],
    ) -> Result<()> {
        self.with(|s| {
            if let Some(item) = s.lost_items.get_mut(&id) {
                item.title = title.to_string();
                item.description = description.to_string();
                item.keywords = keywords.to_vec();
                item.updated_at = Utc::now();
            }
        });
        Ok(())
    }

    async fn found_candidates(
        &self,
        category: Category,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<FoundItem>> {
        Ok(self.with(|s| {
            let mut items: Vec<_> = s
                .found_items
                .values()
                .filter(|i| {
                    i.category == category
                        && i.status == FoundStatus::Unclaimed
                        && i.found_date >= window_start
                        && i.found_date <= window_end
                })
                .cloned()
                .collect();
            items.sort_by(|a, b| b.found_date.cmp(&a.found_date));
            items.truncate(limit as usize);
            items
        }))
    }

    async fn lost_candidates(
        &self,
        category: Category,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<LostItem>> {
        Ok(self.with(|s| {
            let mut items: Vec<_> = s
                .lost_items
                .values()
                .filter(|i| {
                    i.category == category
                        && i.status == LostStatus::Active
                        && i.lost_date >= window_start
                        && i.lost_date <= window_end
                })
                .cloned()
                .collect();
            items.sort_by(|a, b| b.lost_date.cmp(&a.lost_date));
            items.truncate(limit as usize);
            items
        }))
    }

    async fn recent_active_lost(&self, category: Category, limit: i64) -> Result<Vec<LostItem>> {
        Ok(self.with(|s| {
            let mut items: Vec<_> = s
                .lost_items
                .values()
                .filter(|i| i.category == category && i.status == LostStatus::Active)
                .cloned()
                .collect();
            items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            items.truncate(limit as usize);
            items
        }))
    }

    async fn expire_stale_items(&self, cutoff: DateTime<Utc>, batch: i64) -> Result<u64> {
        Ok(self.with(|s| {
            let now = Utc::now();
            let mut expired = 0u64;
            for item in s.lost_items.values_mut() {
                if expired >= batch as u64 {
                    break;
                }
                if item.status == LostStatus::Active && item.updated_at < cutoff {
                    item.status = LostStatus::Expired;
                    item.updated_at = now;
                    expired += 1;
                }
            }
            for item in s.found_items.values_mut() {
                if expired >= 2 * batch as u64 {
                    break;
                }
                if item.status == FoundStatus::Unclaimed && item.updated_at < cutoff {
                    item.status = FoundStatus::Expired;
                    item.updated_at = now;
                    expired += 1;
                }
            }
            expired
        }))
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn insert_secrets(&self, rows: &[SecretQuestion]) -> Result<()> {
        self.with(|s| s.secrets.extend(rows.iter().cloned()));
        Ok(())
    }

    async fn secrets_for(&self, lost_item_id: Uuid) -> Result<Vec<SecretQuestion>> {
        Ok(self.with(|s| {
            let mut rows: Vec<_> = s
                .secrets
                .iter()
                .filter(|q| q.lost_item_id == lost_item_id)
                .cloned()
                .collect();
            rows.sort_by_key(|q| q.position);
            rows
        }))
    }
}

// ============================================================================
// Claims
// ============================================================================

#[async_trait]
impl ClaimStore for MemoryStore {
    async fn insert_claim(&self, claim: &Claim) -> Result<()> {
        self.with(|s| {
            s.claims.insert(claim.id, claim.clone());
        });
        Ok(())
    }

    async fn claim_by_id(&self, id: Uuid) -> Result<Option<Claim>> {
        Ok(self.with(|s| s.claims.get(&id).cloned()))
    }

    async fn live_claim_exists(
        &self,
        lost_item_id: Uuid,
        found_item_id: Uuid,
        claimant_id: Uuid,
    ) -> Result<bool> {
        Ok(self.with(|s| {
            s.claims.values().any(|c| {
                c.lost_item_id == lost_item_id
                    && c.found_item_id == found_item_id
                    && c.claimant_id == claimant_id
                    && c.status.blocks_new_claim()
            })
        }))
    }

    async fn live_claim_count(&self, claimant_id: Uuid) -> Result<i64> {
        Ok(self.with(|s| {
            s.claims
                .values()
                .filter(|c| c.claimant_id == claimant_id && c.status.blocks_new_claim())
                .count() as i64
        }))
    }

    async fn attempts_since(&self, claim_id: Uuid, since: DateTime<Utc>) -> Result<i64> {
        Ok(self.with(|s| {
            s.attempts
                .iter()
                .filter(|a| a.claim_id == claim_id && a.created_at >= since)
                .count() as i64
        }))
    }

    async fn commit_verification_pass(
        &self,
        claim_id: Uuid,
        attempt: &VerificationAttempt,
        score: f64,
    ) -> Result<()> {
        self.with(|s| {
            s.attempts.push(attempt.clone());
            let claim = s
                .claims
                .get_mut(&claim_id)
                .ok_or_else(|| anyhow!("claim {} vanished mid-transaction", claim_id))?;
            claim.status = ClaimStatus::Verified;
            claim.verification_score = score;
            claim.attempts_made += 1;
            claim.consecutive_failures = 0;
            claim.next_attempt_at = None;
            claim.updated_at = Utc::now();
            let (lost_id, found_id) = (claim.lost_item_id, claim.found_item_id);
            if let Some(item) = s.lost_items.get_mut(&lost_id) {
                item.status = LostStatus::Claimed;
                item.updated_at = Utc::now();
            }
            if let Some(item) = s.found_items.get_mut(&found_id) {
                item.status = FoundStatus::Matched;
                item.updated_at = Utc::now();
            }
            Ok(())
        })
    }

    async fn commit_verification_failure(
        &self,
        claim_id: Uuid,
        attempt: &VerificationAttempt,
        score: f64,
        consecutive_failures: i32,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with(|s| {
            s.attempts.push(attempt.clone());
            let claim = s
                .claims
                .get_mut(&claim_id)
                .ok_or_else(|| anyhow!("claim {} vanished mid-transaction", claim_id))?;
            claim.verification_score = score;
            claim.attempts_made += 1;
            claim.consecutive_failures = consecutive_failures;
            claim.next_attempt_at = Some(next_attempt_at);
            claim.updated_at = Utc::now();
            Ok(())
        })
    }

    async fn commit_cancel(&self, claim_id: Uuid, was_verified: bool) -> Result<()> {
        self.with(|s| {
            let claim = s
                .claims
                .get_mut(&claim_id)
                .ok_or_else(|| anyhow!("claim {} vanished mid-transaction", claim_id))?;
            claim.status = ClaimStatus::Cancelled;
            claim.updated_at = Utc::now();
            let (lost_id, found_id) = (claim.lost_item_id, claim.found_item_id);
            if was_verified {
                if let Some(item) = s.lost_items.get_mut(&lost_id) {
                    item.status = LostStatus::Active;
                }
                if let Some(item) = s.found_items.get_mut(&found_id) {
                    item.status = FoundStatus::Unclaimed;
                }
            }
            Ok(())
        })
    }

    async fn expire_stale_claims(&self, cutoff: DateTime<Utc>, batch: i64) -> Result<u64> {
        Ok(self.with(|s| {
            let mut expired = 0u64;
            for claim in s.claims.values_mut() {
                if expired >= batch as u64 {
                    break;
                }
                if claim.status == ClaimStatus::Pending && claim.created_at < cutoff {
                    claim.status = ClaimStatus::Expired;
                    claim.updated_at = Utc::now();
                    expired += 1;
                }
            }
            expired
        }))
    }

    async fn insert_dispute(&self, dispute: &Dispute) -> Result<()> {
        self.with(|s| {
            s.disputes.insert(dispute.id, dispute.clone());
        });
        Ok(())
    }

    async fn dispute_by_id(&self, id: Uuid) -> Result<Option<Dispute>> {
        Ok(self.with(|s| s.disputes.get(&id).cloned()))
    }

    async fn active_dispute_for(&self, claim_id: Uuid) -> Result<Option<Dispute>> {
        Ok(self.with(|s| {
            s.disputes
                .values()
                .find(|d| d.claim_id == claim_id && d.resolution.is_none())
                .cloned()
        }))
    }

    async fn commit_dispute_open(&self, claim_id: Uuid, dispute: &Dispute) -> Result<()> {
        self.with(|s| {
            let claim = s
                .claims
                .get_mut(&claim_id)
                .ok_or_else(|| anyhow!("claim {} vanished mid-transaction", claim_id))?;
            claim.status = ClaimStatus::Disputed;
            claim.updated_at = Utc::now();
            s.disputes.insert(dispute.id, dispute.clone());
            Ok(())
        })
    }

    async fn commit_dispute_resolution(
        &self,
        dispute_id: Uuid,
        resolution: DisputeResolution,
        resolved_by: Uuid,
        target: ClaimStatus,
        notes: Option<&str>,
    ) -> Result<()> {
        self.with(|s| {
            let now = Utc::now();
            let dispute = s
                .disputes
                .get_mut(&dispute_id)
                .ok_or_else(|| anyhow!("dispute {} vanished mid-transaction", dispute_id))?;
            dispute.resolution = Some(resolution);
            dispute.resolved_by = Some(resolved_by);
            dispute.notes = notes.map(str::to_string);
            dispute.resolved_at = Some(now);
            let claim_id = dispute.claim_id;

            let claim = s
                .claims
                .get_mut(&claim_id)
                .ok_or_else(|| anyhow!("claim {} vanished mid-transaction", claim_id))?;
            claim.status = target;
            claim.updated_at = now;
            let (lost_id, found_id) = (claim.lost_item_id, claim.found_item_id);

            let (lost_status, found_status) = if target == ClaimStatus::Verified {
                (LostStatus::Claimed, FoundStatus::Matched)
            } else {
                (LostStatus::Active, FoundStatus::Unclaimed)
            };
            if let Some(item) = s.lost_items.get_mut(&lost_id) {
                item.status = lost_status;
            }
            if let Some(item) = s.found_items.get_mut(&found_id) {
                item.status = found_status;
            }
            Ok(())
        })
    }
}

// ============================================================================
// Handover
// ============================================================================

#[async_trait]
impl HandoverStore for MemoryStore {
    async fn insert_confirmation(&self, confirmation: &HandoverConfirmation) -> Result<()> {
        self.with(|s| {
            s.handovers.insert(confirmation.id, confirmation.clone());
        });
        Ok(())
    }

    async fn confirmation_for(&self, claim_id: Uuid) -> Result<Option<HandoverConfirmation>> {
        Ok(self.with(|s| {
            s.handovers
                .values()
                .find(|h| h.claim_id == claim_id)
                .cloned()
        }))
    }

    async fn delete_confirmation(&self, id: Uuid) -> Result<()> {
        self.with(|s| {
            s.handovers.remove(&id);
        });
        Ok(())
    }

    async fn record_failed_redeem(&self, id: Uuid) -> Result<i32> {
        self.with(|s| {
            let confirmation = s
                .handovers
                .get_mut(&id)
                .ok_or_else(|| anyhow!("handover confirmation {} not found", id))?;
            confirmation.attempts += 1;
            Ok(confirmation.attempts)
        })
    }

    async fn commit_redeem(
        &self,
        claim_id: Uuid,
        confirmation_id: Uuid,
        redeemed_by: Uuid,
        redeemed_at: DateTime<Utc>,
    ) -> Result<bool> {
        self.with(|s| {
            let confirmation = s
                .handovers
                .get_mut(&confirmation_id)
                .ok_or_else(|| anyhow!("handover confirmation {} not found", confirmation_id))?;
            if confirmation.verified {
                return Ok(false);
            }
            confirmation.verified = true;
            confirmation.attempts += 1;
            confirmation.redeemed_by = Some(redeemed_by);
            confirmation.redeemed_at = Some(redeemed_at);

            let claim = s
                .claims
                .get_mut(&claim_id)
                .ok_or_else(|| anyhow!("claim {} vanished mid-transaction", claim_id))?;
            claim.status = ClaimStatus::Returned;
            claim.updated_at = redeemed_at;
            let (lost_id, found_id) = (claim.lost_item_id, claim.found_item_id);
            if let Some(item) = s.lost_items.get_mut(&lost_id) {
                item.status = LostStatus::Returned;
            }
            if let Some(item) = s.found_items.get_mut(&found_id) {
                item.status = FoundStatus::Returned;
            }
            Ok(true)
        })
    }
}

// ============================================================================
// Trust ledger
// ============================================================================

#[async_trait]
impl TrustStore for MemoryStore {
    async fn append_trust_event(
        &self,
        user_id: Uuid,
        reason: TrustReason,
    ) -> Result<TrustEvent> {
        self.with(|s| {
            let user = s
                .users
                .get_mut(&user_id)
                .ok_or_else(|| anyhow!("user {} not found for trust write", user_id))?;

            let delta = reason.delta();
            let applied = trust::apply_delta(user.trust_score, delta);
            let now = Utc::now();

            user.trust_score = applied.new_score;
            user.updated_at = now;
            if applied.auto_ban {
                user.is_banned = true;
                user.ban_reason = Some(trust::AUTO_BAN_REASON.to_string());
            }

            let event = TrustEvent {
                id: Uuid::new_v4(),
                user_id,
                delta,
                reason,
                new_score: applied.new_score,
                created_at: now,
            };
            s.trust_events.push(event.clone());
            Ok(event)
        })
    }

    async fn trust_events_for(&self, user_id: Uuid) -> Result<Vec<TrustEvent>> {
        Ok(self.with(|s| {
            s.trust_events
                .iter()
                .filter(|e| e.user_id == user_id)
                .cloned()
                .collect()
        }))
    }
}

// ============================================================================
// Matching cache
// ============================================================================

#[async_trait]
impl MatchStore for MemoryStore {
    async fn cache_get(&self, lost_item_id: Uuid) -> Result<Option<MatchCacheRow>> {
        Ok(self.with(|s| s.match_cache.get(&lost_item_id).cloned()))
    }

    async fn cache_put(&self, row: &MatchCacheRow) -> Result<()> {
        self.with(|s| {
            s.match_cache.insert(row.lost_item_id, row.clone());
        });
        Ok(())
    }
}

// ============================================================================
// Activity, reports & audit
// ============================================================================

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn log_action(&self, entry: &ActionLogEntry) -> Result<()> {
        self.with(|s| s.actions.push(entry.clone()));
        Ok(())
    }

    async fn actions_since(
        &self,
        user_id: Uuid,
        kind: Option<ActionKind>,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        Ok(self.with(|s| {
            s.actions
                .iter()
                .filter(|a| {
                    a.user_id == user_id
                        && a.created_at >= since
                        && kind.map_or(true, |k| a.kind == k)
                })
                .count() as i64
        }))
    }

    async fn failed_attempts_since(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<i64> {
        Ok(self.with(|s| {
            s.attempts
                .iter()
                .filter(|a| {
                    a.user_id == user_id
                        && a.status == AttemptStatus::Failed
                        && a.created_at >= since
                })
                .count() as i64
        }))
    }

    async fn distinct_failed_items_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        Ok(self.with(|s| {
            let mut items: Vec<Uuid> = s
                .attempts
                .iter()
                .filter(|a| {
                    a.user_id == user_id
                        && a.status == AttemptStatus::Failed
                        && a.created_at >= since
                })
                .filter_map(|a| s.claims.get(&a.claim_id).map(|c| c.lost_item_id))
                .collect();
            items.sort();
            items.dedup();
            items.len() as i64
        }))
    }

    async fn accounts_on_ip_since(
        &self,
        ip: &str,
        excluding: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        Ok(self.with(|s| {
            let mut users: Vec<Uuid> = s
                .actions
                .iter()
                .filter(|a| {
                    a.ip.as_deref() == Some(ip)
                        && a.user_id != excluding
                        && a.created_at >= since
                })
                .map(|a| a.user_id)
                .collect();
            users.sort();
            users.dedup();
            users.len() as i64
        }))
    }

    async fn ip_seen_for_user(&self, user_id: Uuid, ip: &str) -> Result<bool> {
        Ok(self.with(|s| {
            s.actions
                .iter()
                .any(|a| a.user_id == user_id && a.ip.as_deref() == Some(ip))
        }))
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn insert_report(&self, report: &ScamReport) -> Result<()> {
        self.with(|s| {
            s.reports.insert(report.id, report.clone());
        });
        Ok(())
    }

    async fn report_by_id(&self, id: Uuid) -> Result<Option<ScamReport>> {
        Ok(self.with(|s| s.reports.get(&id).cloned()))
    }

    async fn open_reports(&self, limit: i64) -> Result<Vec<ScamReport>> {
        Ok(self.with(|s| {
            let mut reports: Vec<_> = s
                .reports
                .values()
                .filter(|r| r.status == ReportStatus::Open)
                .cloned()
                .collect();
            reports.sort_by_key(|r| r.created_at);
            reports.truncate(limit as usize);
            reports
        }))
    }

    async fn resolve_report(
        &self,
        id: Uuid,
        status: ReportStatus,
        resolved_by: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with(|s| {
            if let Some(report) = s.reports.get_mut(&id) {
                if report.status == ReportStatus::Open {
                    report.status = status;
                    report.resolved_by = Some(resolved_by);
                    report.resolved_at = Some(resolved_at);
                }
            }
        });
        Ok(())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
        self.with(|s| s.audit.push(entry.clone()));
        Ok(())
    }

    async fn audit_for_entity(
        &self,
        entity: &str,
        entity_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AuditEntry>> {
        Ok(self.with(|s| {
            let mut entries: Vec<_> = s
                .audit
                .iter()
                .filter(|e| e.entity == entity && e.entity_id == Some(entity_id))
                .cloned()
                .collect();
            entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            entries.truncate(limit as usize);
            entries
        }))
    }

    async fn recent_audit(&self, limit: i64) -> Result<Vec<AuditEntry>> {
        Ok(self.with(|s| {
            let mut entries: Vec<_> = s.audit.iter().cloned().collect();
            entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            entries.truncate(limit as usize);
            entries
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: format!("{}@test.rw", Uuid::new_v4()),
            phone: None,
            display_name: "Test".into(),
            password_hash: "hash".into(),
            role: Role::Citizen,
            trust_score: 0,
            email_verified: false,
            phone_verified: false,
            is_banned: false,
            ban_reason: None,
            cooperative_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_retrieve_user() {
        let store = MemoryStore::new();
        let user = sample_user();
        store.insert_user(&user).await.unwrap();

        let by_id = store.user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, user.email);
        let by_email = store.user_by_email(&user.email).await.unwrap();
        assert!(by_email.is_some());
    }

    #[tokio::test]
    async fn test_identity_taken() {
        let store = MemoryStore::new();
        let mut user = sample_user();
        user.phone = Some("+250788000001".into());
        store.insert_user(&user).await.unwrap();

        assert!(store.identity_taken(&user.email, None).await.unwrap());
        assert!(store
            .identity_taken("other@test.rw", Some("+250788000001"))
            .await
            .unwrap());
        assert!(!store.identity_taken("other@test.rw", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_trust_append_updates_score_and_bans() {
        let store = MemoryStore::new();
        let mut user = sample_user();
        user.trust_score = -8;
        store.insert_user(&user).await.unwrap();

        let event = store
            .append_trust_event(user.id, TrustReason::ScamConfirmed)
            .await
            .unwrap();
        assert_eq!(event.new_score, -28);

        let updated = store.user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(updated.trust_score, -28);
        assert!(updated.is_banned);
        assert_eq!(updated.ban_reason.as_deref(), Some(trust::AUTO_BAN_REASON));
    }

    #[tokio::test]
    async fn test_double_redeem_rejected() {
        let store = MemoryStore::new();
        let user = sample_user();
        store.insert_user(&user).await.unwrap();

        let claim_id = Uuid::new_v4();
        let claim = Claim {
            id: claim_id,
            lost_item_id: Uuid::new_v4(),
            found_item_id: Uuid::new_v4(),
            claimant_id: user.id,
            status: ClaimStatus::Verified,
            verification_score: 1.0,
            attempts_made: 1,
            consecutive_failures: 0,
            next_attempt_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.insert_claim(&claim).await.unwrap();

        let confirmation = HandoverConfirmation {
            id: Uuid::new_v4(),
            claim_id,
            otp_hash: "hash".into(),
            expires_at: Utc::now() + chrono::Duration::hours(24),
            verified: false,
            attempts: 0,
            max_attempts: 3,
            redeemed_by: None,
            redeemed_at: None,
            created_at: Utc::now(),
        };
        store.insert_confirmation(&confirmation).await.unwrap();

        let redeemer = Uuid::new_v4();
        let first = store
            .commit_redeem(claim_id, confirmation.id, redeemer, Utc::now())
            .await
            .unwrap();
        assert!(first);

        let second = store
            .commit_redeem(claim_id, confirmation.id, redeemer, Utc::now())
            .await
            .unwrap();
        assert!(!second, "second redemption must be refused");
    }

    #[tokio::test]
    async fn test_consume_reset_is_single_use() {
        let store = MemoryStore::new();
        let row = ResetTokenRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "abc".into(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
            used_at: None,
            created_at: Utc::now(),
        };
        store.insert_reset(&row).await.unwrap();

        let first = store.consume_reset("abc", Utc::now()).await.unwrap();
        assert!(first.is_some());
        let second = store.consume_reset("abc", Utc::now()).await.unwrap();
        assert!(second.is_none());
    }
}
