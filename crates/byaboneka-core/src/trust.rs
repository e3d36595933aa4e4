//! Trust ledger math and derived permission tiers.
//!
//! The ledger is append-only: a user's `trust_score` is always the clamped
//! sum of their event deltas, and every write snapshots the post-write score
//! onto the event row so the invariant can be audited later. Tiers are
//! derived, never stored.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Score bounds.
pub const TRUST_MIN: i32 = -100;
pub const TRUST_MAX: i32 = 100;

/// At or below this score the user is automatically banned.
pub const AUTO_BAN_THRESHOLD: i32 = -10;

/// Ban reason recorded on the auto-ban path.
pub const AUTO_BAN_REASON: &str = "low trust";

// ============================================================================
// Reasons & authoritative deltas
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustReason {
    /// Finder side of a completed handover.
    ReturnCompletedFinder,
    /// Owner side of a completed handover.
    ReturnCompletedOwner,
    EmailVerified,
    PhoneVerified,
    FailedVerification,
    /// Three or more failed attempts inside the trailing 7 days.
    RepeatedFailedClaims,
    ScamReported,
    ScamConfirmed,
    FalseScamReport,
    AccurateReportConfirmed,
}

impl TrustReason {
    /// The authoritative delta for each reason. There is no other source of
    /// these numbers anywhere in the system.
    pub fn delta(self) -> i32 {
        match self {
            TrustReason::ReturnCompletedFinder => 3,
            TrustReason::ReturnCompletedOwner => 2,
            TrustReason::EmailVerified => 1,
            TrustReason::PhoneVerified => 2,
            TrustReason::FailedVerification => -2,
            TrustReason::RepeatedFailedClaims => -5,
            TrustReason::ScamReported => -5,
            TrustReason::ScamConfirmed => -20,
            TrustReason::FalseScamReport => -3,
            TrustReason::AccurateReportConfirmed => 1,
        }
    }

    /// A short human reason for the ledger row.
    pub fn describe(self) -> &'static str {
        match self {
            TrustReason::ReturnCompletedFinder => "item returned to owner",
            TrustReason::ReturnCompletedOwner => "recovered own item",
            TrustReason::EmailVerified => "email verified",
            TrustReason::PhoneVerified => "phone verified",
            TrustReason::FailedVerification => "failed verification attempt",
            TrustReason::RepeatedFailedClaims => "repeated failed claims",
            TrustReason::ScamReported => "reported for scam",
            TrustReason::ScamConfirmed => "scam confirmed",
            TrustReason::FalseScamReport => "filed a false scam report",
            TrustReason::AccurateReportConfirmed => "accurate report confirmed",
        }
    }
}

impl fmt::Display for TrustReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrustReason::ReturnCompletedFinder => "return_completed_finder",
            TrustReason::ReturnCompletedOwner => "return_completed_owner",
            TrustReason::EmailVerified => "email_verified",
            TrustReason::PhoneVerified => "phone_verified",
            TrustReason::FailedVerification => "failed_verification",
            TrustReason::RepeatedFailedClaims => "repeated_failed_claims",
            TrustReason::ScamReported => "scam_reported",
            TrustReason::ScamConfirmed => "scam_confirmed",
            TrustReason::FalseScamReport => "false_scam_report",
            TrustReason::AccurateReportConfirmed => "accurate_report_confirmed",
        };
        f.write_str(s)
    }
}

impl FromStr for TrustReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "return_completed_finder" => Ok(TrustReason::ReturnCompletedFinder),
            "return_completed_owner" => Ok(TrustReason::ReturnCompletedOwner),
            "email_verified" => Ok(TrustReason::EmailVerified),
            "phone_verified" => Ok(TrustReason::PhoneVerified),
            "failed_verification" => Ok(TrustReason::FailedVerification),
            "repeated_failed_claims" => Ok(TrustReason::RepeatedFailedClaims),
            "scam_reported" => Ok(TrustReason::ScamReported),
            "scam_confirmed" => Ok(TrustReason::ScamConfirmed),
            "false_scam_report" => Ok(TrustReason::FalseScamReport),
            "accurate_report_confirmed" => Ok(TrustReason::AccurateReportConfirmed),
            other => Err(format!("unknown trust reason: {}", other)),
        }
    }
}

// ============================================================================
// Score application
// ============================================================================

/// Outcome of applying one delta to a current score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustApplication {
    pub new_score: i32,
    /// True when this write crossed the auto-ban floor: the store must ban
    /// the user in the same transaction.
    pub auto_ban: bool,
}

pub fn clamp_score(raw: i64) -> i32 {
    raw.clamp(TRUST_MIN as i64, TRUST_MAX as i64) as i32
}

/// Apply a delta to the current score. The ban fires only on the crossing
/// edge: a user already at or below the floor does not get re-banned by
/// further negative writes.
pub fn apply_delta(current: i32, delta: i32) -> TrustApplication {
    let new_score = clamp_score(current as i64 + delta as i64);
    TrustApplication {
        new_score,
        auto_ban: current > AUTO_BAN_THRESHOLD && new_score <= AUTO_BAN_THRESHOLD,
    }
}

/// Recompute a score from the full delta history, folding the same clamped
/// application writes use so the two can never disagree, saturation
/// included. The result must equal the stored `trust_score`; the admin
/// recompute operation asserts this.
pub fn recompute(deltas: impl IntoIterator<Item = i32>) -> i32 {
    deltas
        .into_iter()
        .fold(0, |score, delta| apply_delta(score, delta).new_score)
}

// ============================================================================
// Derived tiers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Suspended,
    Restricted,
    New,
    Established,
    Trusted,
}

impl Tier {
    pub fn from_score(score: i32) -> Self {
        if score < -10 {
            Tier::Suspended
        } else if score < 0 {
            Tier::Restricted
        } else if score < 5 {
            Tier::New
        } else if score < 15 {
            Tier::Established
        } else {
            Tier::Trusted
        }
    }

    /// Open claims allowed at a time.
    pub fn claim_cap(self) -> u32 {
        match self {
            Tier::Suspended => 0,
            Tier::Restricted => 1,
            Tier::New => 3,
            Tier::Established => 5,
            Tier::Trusted => 7,
        }
    }

    /// Item reports allowed per 24 hours.
    pub fn report_cap(self) -> u32 {
        match self {
            Tier::Suspended => 0,
            Tier::Restricted => 1,
            Tier::New => 3,
            Tier::Established => 5,
            Tier::Trusted => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deltas_are_authoritative() {
        assert_eq!(TrustReason::ReturnCompletedFinder.delta(), 3);
        assert_eq!(TrustReason::ReturnCompletedOwner.delta(), 2);
        assert_eq!(TrustReason::EmailVerified.delta(), 1);
        assert_eq!(TrustReason::PhoneVerified.delta(), 2);
        assert_eq!(TrustReason::FailedVerification.delta(), -2);
        assert_eq!(TrustReason::RepeatedFailedClaims.delta(), -5);
        assert_eq!(TrustReason::ScamReported.delta(), -5);
        assert_eq!(TrustReason::ScamConfirmed.delta(), -20);
        assert_eq!(TrustReason::FalseScamReport.delta(), -3);
        assert_eq!(TrustReason::AccurateReportConfirmed.delta(), 1);
    }

    #[test]
    fn test_clamping() {
        assert_eq!(apply_delta(-95, -20).new_score, -100);
        assert_eq!(apply_delta(95, 20).new_score, 100);
        assert_eq!(apply_delta(0, 3).new_score, 3);
    }

    #[test]
    fn test_auto_ban_edge() {
        // -8 with a confirmed scam: clamped -28, crossing the floor.
        let applied = apply_delta(-8, TrustReason::ScamConfirmed.delta());
        assert_eq!(applied.new_score, -28);
        assert!(applied.auto_ban);

        // Already below the floor: no re-ban edge.
        let again = apply_delta(-28, -2);
        assert!(!again.auto_ban);

        // Exactly reaching -10 bans.
        let exact = apply_delta(-8, -2);
        assert_eq!(exact.new_score, -10);
        assert!(exact.auto_ban);
    }

    #[test]
    fn test_recompute_matches_apply() {
        let deltas = [3, 2, -2, -20, 1, -5];
        let mut running = 0;
        for d in deltas {
            running = apply_delta(running, d).new_score;
        }
        assert_eq!(recompute(deltas), running);
    }

    #[test]
    fn test_tier_bands() {
        assert_eq!(Tier::from_score(-11), Tier::Suspended);
        assert_eq!(Tier::from_score(-10), Tier::Restricted);
        assert_eq!(Tier::from_score(-1), Tier::Restricted);
        assert_eq!(Tier::from_score(0), Tier::New);
        assert_eq!(Tier::from_score(4), Tier::New);
        assert_eq!(Tier::from_score(5), Tier::Established);
        assert_eq!(Tier::from_score(14), Tier::Established);
        assert_eq!(Tier::from_score(15), Tier::Trusted);
    }

    #[test]
    fn test_tier_caps() {
        assert_eq!(Tier::Suspended.claim_cap(), 0);
        assert_eq!(Tier::Restricted.claim_cap(), 1);
        assert_eq!(Tier::New.claim_cap(), 3);
        assert_eq!(Tier::Established.claim_cap(), 5);
        assert_eq!(Tier::Trusted.claim_cap(), 7);
        assert_eq!(Tier::Trusted.report_cap(), 10);
    }
}
