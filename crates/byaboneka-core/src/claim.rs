// ============================================================================
// Claim State Machine
//
// The authoritative lifecycle for a claim. It enforces:
//   • Valid state transitions
//   • The progressive verification cooldown table
//   • The daily attempt cap
//   • Verification pass/fail math
//
// This module is pure: persistence, fraud gating, trust deltas and
// notifications are coordinated by the claim service, which is the single
// writer for any given claim row.
// ============================================================================

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::types::ClaimStatus;
use crate::validation::SECRET_QUESTION_COUNT;

/// Per-claim verification attempts allowed per 24 hours.
pub const DAILY_ATTEMPT_CAP: i64 = 3;

/// Pending claims expire after this many days without a pass.
pub const CLAIM_TTL_DAYS: i64 = 7;

/// Items untouched this long are archived by the reaper.
pub const ITEM_TTL_DAYS: i64 = 30;

/// Correct answers required to pass.
pub const PASS_THRESHOLD: u8 = 2;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClaimStateError {
    #[error("Invalid transition: {0:?} → {1:?}")]
    InvalidTransition(ClaimStatus, ClaimStatus),

    #[error("Terminal state {0:?} cannot transition")]
    TerminalState(ClaimStatus),

    #[error("Claim already in state {0:?}")]
    AlreadyInState(ClaimStatus),
}

// ============================================================================
// Transition table
// ============================================================================

pub trait ClaimStatusExt {
    fn is_terminal(&self) -> bool;
    fn blocks_new_claim(&self) -> bool;
    fn can_transition_to(&self, target: ClaimStatus) -> bool;
}

impl ClaimStatusExt for ClaimStatus {
    /// Frozen states: nothing, not even a dispute, moves them.
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClaimStatus::Returned | ClaimStatus::Cancelled | ClaimStatus::Expired
        )
    }

    /// States that hold the (lost, found, claimant) tuple: at most one claim
    /// per tuple may be in one of these. A rejected claim neither blocks a
    /// fresh claim nor is frozen (it may still be disputed).
    fn blocks_new_claim(&self) -> bool {
        matches!(
            self,
            ClaimStatus::Pending | ClaimStatus::Verified | ClaimStatus::Disputed
        )
    }

    fn can_transition_to(&self, target: ClaimStatus) -> bool {
        use ClaimStatus::*;

        if self.is_terminal() {
            return false;
        }

        match (self, target) {
            (Pending, Verified) => true,
            (Pending, Cancelled) => true,
            (Pending, Expired) => true,

            (Verified, Returned) => true,
            (Verified, Cancelled) => true,

            // Disputes fork from any non-frozen, non-disputed state
            (Pending, Disputed) => true,
            (Verified, Disputed) => true,
            (Rejected, Disputed) => true,

            // Operator resolution
            (Disputed, Verified) => true,
            (Disputed, Rejected) => true,
            (Disputed, Pending) => true,

            _ => false,
        }
    }
}

/// Validate one transition, mirroring the checks a session-style state
/// machine runs before mutating.
pub fn check_transition(
    current: ClaimStatus,
    target: ClaimStatus,
) -> Result<(), ClaimStateError> {
    if current == target {
        return Err(ClaimStateError::AlreadyInState(target));
    }
    if current.is_terminal() {
        return Err(ClaimStateError::TerminalState(current));
    }
    if !current.can_transition_to(target) {
        return Err(ClaimStateError::InvalidTransition(current, target));
    }
    Ok(())
}

// ============================================================================
// Cooldown table
// ============================================================================

/// Progressive cooldown after consecutive failures:
/// 1 ⇒ +1h, 2 ⇒ +4h, ≥3 ⇒ +24h.
pub fn cooldown_after(consecutive_failures: i32) -> Duration {
    match consecutive_failures {
        i32::MIN..=0 => Duration::zero(),
        1 => Duration::hours(1),
        2 => Duration::hours(4),
        _ => Duration::hours(24),
    }
}

/// True while a cooldown deadline is still in the future.
pub fn in_cooldown(next_attempt_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    matches!(next_attempt_at, Some(deadline) if deadline > now)
}

// ============================================================================
// Verification math
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerificationOutcome {
    pub correct: u8,
    /// correct / 3.
    pub score: f64,
    pub passed: bool,
}

pub fn evaluate_answers(bits: &[bool; SECRET_QUESTION_COUNT]) -> VerificationOutcome {
    let correct = bits.iter().filter(|b| **b).count() as u8;
    VerificationOutcome {
        correct,
        score: f64::from(correct) / SECRET_QUESTION_COUNT as f64,
        passed: correct >= PASS_THRESHOLD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_transition_path() {
        assert!(check_transition(ClaimStatus::Pending, ClaimStatus::Verified).is_ok());
        assert!(check_transition(ClaimStatus::Verified, ClaimStatus::Returned).is_ok());
    }

    #[test]
    fn test_terminal_states_are_frozen() {
        for terminal in [
            ClaimStatus::Returned,
            ClaimStatus::Cancelled,
            ClaimStatus::Expired,
        ] {
            assert!(terminal.is_terminal());
            assert!(matches!(
                check_transition(terminal, ClaimStatus::Disputed),
                Err(ClaimStateError::TerminalState(_))
            ));
        }
    }

    #[test]
    fn test_rejected_is_disputable_but_not_blocking() {
        assert!(!ClaimStatus::Rejected.is_terminal());
        assert!(!ClaimStatus::Rejected.blocks_new_claim());
        assert!(check_transition(ClaimStatus::Rejected, ClaimStatus::Disputed).is_ok());
        assert!(check_transition(ClaimStatus::Rejected, ClaimStatus::Verified).is_err());
    }

    #[test]
    fn test_dispute_resolution_targets() {
        for target in [
            ClaimStatus::Verified,
            ClaimStatus::Rejected,
            ClaimStatus::Pending,
        ] {
            assert!(check_transition(ClaimStatus::Disputed, target).is_ok());
        }
        assert!(check_transition(ClaimStatus::Disputed, ClaimStatus::Returned).is_err());
    }

    #[test]
    fn test_no_self_transition() {
        assert!(matches!(
            check_transition(ClaimStatus::Pending, ClaimStatus::Pending),
            Err(ClaimStateError::AlreadyInState(_))
        ));
    }

    #[test]
    fn test_pending_cannot_skip_to_returned() {
        assert!(matches!(
            check_transition(ClaimStatus::Pending, ClaimStatus::Returned),
            Err(ClaimStateError::InvalidTransition(_, _))
        ));
    }

    #[test]
    fn test_cooldown_table() {
        assert_eq!(cooldown_after(0), Duration::zero());
        assert_eq!(cooldown_after(1), Duration::hours(1));
        assert_eq!(cooldown_after(2), Duration::hours(4));
        assert_eq!(cooldown_after(3), Duration::hours(24));
        assert_eq!(cooldown_after(10), Duration::hours(24));
    }

    #[test]
    fn test_in_cooldown() {
        let now = Utc::now();
        assert!(in_cooldown(Some(now + Duration::minutes(30)), now));
        assert!(!in_cooldown(Some(now - Duration::minutes(1)), now));
        assert!(!in_cooldown(None, now));
    }

    #[test]
    fn test_evaluate_answers() {
        let all = evaluate_answers(&[true, true, true]);
        assert!(all.passed);
        assert_eq!(all.correct, 3);
        assert!((all.score - 1.0).abs() < f64::EPSILON);

        let two = evaluate_answers(&[true, false, true]);
        assert!(two.passed);
        assert!((two.score - 2.0 / 3.0).abs() < 1e-9);

        let one = evaluate_answers(&[false, true, false]);
        assert!(!one.passed);

        let none = evaluate_answers(&[false, false, false]);
        assert!(!none.passed);
        assert_eq!(none.score, 0.0);
    }
}
