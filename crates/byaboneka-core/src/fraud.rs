//! Behavioral fraud scoring.
//!
//! `assess` is a pure function over a pre-gathered [`FraudInput`]; the
//! service layer fills the counters from the activity store and decides
//! nothing itself. Factor weights are fixed here and nowhere else.
//!
//! The message heuristic at the bottom flags extortion-shaped text (a
//! payment term AND a conditional term). It is advisory only and must never
//! be used as a hard gate.

use serde::{Deserialize, Serialize};

/// Reject the enclosing operation outright at or above this score.
pub const BLOCK_THRESHOLD: u32 = 70;

/// Flag for human review at or above this score.
pub const FLAG_THRESHOLD: u32 = 40;

// ============================================================================
// Input & output
// ============================================================================

/// Counters describing one user at the moment of one action.
#[derive(Debug, Clone, Default)]
pub struct FraudInput {
    pub account_age_hours: i64,
    pub email_verified: bool,
    pub phone_verified: bool,
    /// Failed verification attempts in the trailing 24 hours.
    pub failed_attempts_24h: u32,
    /// Distinct items with failed attempts in the trailing 7 days.
    pub distinct_failed_items_7d: u32,
    /// Other accounts seen on the caller's IP in the trailing 24 hours.
    pub accounts_sharing_ip_24h: u32,
    /// True when this user has never acted from this IP before.
    pub ip_first_seen: bool,
    pub claims_created_last_hour: u32,
    pub reports_last_24h: u32,
    pub actions_last_hour: u32,
    pub trust_score: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Elevated,
    Critical,
}

/// One contributing factor, kept for the audit log and admin review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub points: u32,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u32,
    pub level: RiskLevel,
    pub should_block: bool,
    pub should_flag: bool,
    pub factors: Vec<RiskFactor>,
}

// ============================================================================
// Scoring
// ============================================================================

pub fn assess(input: &FraudInput) -> RiskAssessment {
    let mut factors = Vec::new();
    let add = |points: u32, label: &str, factors: &mut Vec<RiskFactor>| {
        factors.push(RiskFactor {
            points,
            label: label.to_string(),
        });
    };

    // 1. Account age
    if input.account_age_hours < 24 {
        add(20, "account younger than 24 hours", &mut factors);
    } else if input.account_age_hours < 24 * 7 {
        add(10, "account younger than 7 days", &mut factors);
    }

    // 2. Verification status
    if !input.email_verified && !input.phone_verified {
        add(15, "no verified contact channel", &mut factors);
    } else if !input.phone_verified {
        add(5, "phone not verified", &mut factors);
    }

    // 3. Failed claim history
    let failure_points = (input.failed_attempts_24h * 10).min(30);
    if failure_points > 0 {
        add(failure_points, "failed verification attempts in 24h", &mut factors);
    }
    if input.distinct_failed_items_7d >= 5 {
        add(25, "failed claims across 5+ items in 7 days", &mut factors);
    }

    // 4. IP anomalies
    if input.accounts_sharing_ip_24h >= 3 {
        add(15, "IP shared with 3+ accounts in 24h", &mut factors);
    } else if input.accounts_sharing_ip_24h >= 1 {
        add(5, "IP shared with another account in 24h", &mut factors);
    }
    if input.ip_first_seen {
        add(5, "first action from this IP", &mut factors);
    }

    // 5. Velocity
    if input.claims_created_last_hour >= 5 {
        add(25, "5+ claims created in the last hour", &mut factors);
    }
    if input.reports_last_24h >= 10 {
        add(20, "10+ reports in 24 hours", &mut factors);
    }
    if input.actions_last_hour >= 30 {
        add(15, "30+ actions in the last hour", &mut factors);
    }

    // 6. Trust
    if input.trust_score < -10 {
        add(20, "suspended-band trust score", &mut factors);
    } else if input.trust_score < 0 {
        let points = ((input.trust_score.unsigned_abs()) * 2).min(15);
        add(points, "negative trust score", &mut factors);
    }

    let score: u32 = factors.iter().map(|f| f.points).sum::<u32>().min(100);
    let (level, should_block, should_flag) = if score >= BLOCK_THRESHOLD {
        (RiskLevel::Critical, true, true)
    } else if score >= FLAG_THRESHOLD {
        (RiskLevel::Elevated, false, true)
    } else {
        (RiskLevel::Low, false, false)
    };

    RiskAssessment {
        score,
        level,
        should_block,
        should_flag,
        factors,
    }
}

// ============================================================================
// Message heuristic (advisory)
// ============================================================================

/// Payment-demand vocabulary, English and Kinyarwanda.
const PAYMENT_TERMS: &[&str] = &[
    "money", "pay", "payment", "cash", "momo", "mobile money", "airtel money",
    "amafaranga", "kwishyura", "transfer", "deposit", "fee", "reward", "frw",
    "rwf",
];

/// Conditional vocabulary: terms tying the handover to the demand.
const CONDITIONAL_TERMS: &[&str] = &[
    "before", "first", "unless", "otherwise", "or else", "only if", "until",
    "mbere", "utanze", "niba utanze",
];

/// True when a message contains BOTH a payment and a conditional term.
/// Advisory flag for moderators; never a gate.
pub fn is_suspicious_message(text: &str) -> bool {
    let lowered = text.to_lowercase();
    let has_payment = PAYMENT_TERMS.iter().any(|t| lowered.contains(t));
    let has_conditional = CONDITIONAL_TERMS.iter().any(|t| lowered.contains(t));
    has_payment && has_conditional
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean_input() -> FraudInput {
        FraudInput {
            account_age_hours: 24 * 30,
            email_verified: true,
            phone_verified: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_account_allows() {
        let result = assess(&clean_input());
        assert_eq!(result.score, 0);
        assert_eq!(result.level, RiskLevel::Low);
        assert!(!result.should_block);
        assert!(!result.should_flag);
    }

    #[test]
    fn test_new_unverified_account_is_elevated() {
        let input = FraudInput {
            account_age_hours: 2,
            email_verified: false,
            phone_verified: false,
            ip_first_seen: true,
            ..Default::default()
        };
        // 20 + 15 + 5 = 40: flag, not block.
        let result = assess(&input);
        assert_eq!(result.score, 40);
        assert_eq!(result.level, RiskLevel::Elevated);
        assert!(result.should_flag);
        assert!(!result.should_block);
    }

    #[test]
    fn test_failure_points_capped() {
        let input = FraudInput {
            failed_attempts_24h: 9,
            ..clean_input()
        };
        assert_eq!(assess(&input).score, 30);
    }

    #[test]
    fn test_block_threshold() {
        let input = FraudInput {
            account_age_hours: 1,
            email_verified: false,
            phone_verified: false,
            failed_attempts_24h: 3,
            distinct_failed_items_7d: 5,
            ..Default::default()
        };
        // 20 + 15 + 30 + 25 = 90
        let result = assess(&input);
        assert!(result.score >= BLOCK_THRESHOLD);
        assert_eq!(result.level, RiskLevel::Critical);
        assert!(result.should_block);
    }

    #[test]
    fn test_negative_trust_scaling() {
        let mild = FraudInput {
            trust_score: -3,
            ..clean_input()
        };
        assert_eq!(assess(&mild).score, 6);

        let capped = FraudInput {
            trust_score: -9,
            ..clean_input()
        };
        assert_eq!(assess(&capped).score, 15);

        let suspended = FraudInput {
            trust_score: -11,
            ..clean_input()
        };
        assert_eq!(assess(&suspended).score, 20);
    }

    #[test]
    fn test_every_factor_is_reported() {
        let input = FraudInput {
            account_age_hours: 1,
            email_verified: false,
            phone_verified: false,
            ..Default::default()
        };
        let result = assess(&input);
        let total: u32 = result.factors.iter().map(|f| f.points).sum();
        assert_eq!(total, result.score);
        assert_eq!(result.factors.len(), 2);
    }

    #[test]
    fn test_message_heuristic_needs_both_terms() {
        assert!(is_suspicious_message(
            "Send me 5000 RWF first, then I give you the phone"
        ));
        assert!(is_suspicious_message("utanze amafaranga nzaguha telefone"));
        // Payment term alone
        assert!(!is_suspicious_message("No payment needed, it is your phone"));
        // Conditional term alone
        assert!(!is_suspicious_message("Call me before noon"));
        assert!(!is_suspicious_message("Meet me at the kiosk"));
    }
}
