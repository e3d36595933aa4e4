//! End-to-end claim lifecycle scenarios over the in-memory store.
//!
//! Covers:
//!   • Happy path (report → match → claim → verify → mint → redeem)
//!   • Two-of-three verification
//!   • Cooldown after a failed attempt
//!   • Wrong-code redemption attempts with a countdown
//!   • The owner never being a valid redeemer
//!   • Redeem idempotence
//!   • Auto-ban at the trust floor
//!   • Dispute fork and operator resolution

mod common;

use chrono::{Duration, Utc};
use common::{citizen, env, reload};

use byaboneka_core::error::DomainError;
use byaboneka_core::types::*;
use byaboneka_service::handover::OWNER_REDEEM_MESSAGE;
use byaboneka_service::items::{QuestionPair, ReportFoundRequest, ReportLostRequest};
use byaboneka_service::Actor;

fn iphone_lost_request() -> ReportLostRequest {
    ReportLostRequest {
        category: Category::Electronics,
        title: "Black iPhone 13 Pro".into(),
        description: "Black iPhone 13 Pro lost on the bus near Kimironko market".into(),
        location_area: "Kimironko".into(),
        lost_date: Utc::now(),
        verification_questions: vec![
            QuestionPair {
                q: "What is the wallpaper?".into(),
                a: "mountains".into(),
            },
            QuestionPair {
                q: "How many apps are in the dock?".into(),
                a: "3".into(),
            },
            QuestionPair {
                q: "Which music app is installed?".into(),
                a: "spotify".into(),
            },
        ],
    }
}

fn iphone_found_request() -> ReportFoundRequest {
    ReportFoundRequest {
        category: Category::Electronics,
        title: "iPhone Kimironko".into(),
        description: "Found a black iPhone at the Kimironko taxi stage".into(),
        location_area: "Kimironko".into(),
        found_date: Utc::now(),
        image_urls: vec![],
        cooperative_id: None,
    }
}

/// Report both items and open a claim, returning (owner, finder, lost, found, claim).
async fn seeded_claim(
    env: &common::TestEnv,
) -> (Actor, Actor, LostItem, FoundItem, Claim) {
    let owner = citizen(env, "owner").await;
    let finder = citizen(env, "finder").await;

    let lost = env
        .items
        .report_lost(&owner, iphone_lost_request())
        .await
        .unwrap();
    let found = env
        .items
        .report_found(&finder, iphone_found_request())
        .await
        .unwrap();

    let claim = env
        .claims
        .open_claim(&owner, lost.id, found.id)
        .await
        .unwrap();
    (owner, finder, lost, found, claim)
}

// ============================================================================
// Scenario 1: happy path
// ============================================================================

#[tokio::test]
async fn test_happy_path_report_to_returned() {
    let env = env();
    let (owner, finder, lost, found, claim) = seeded_claim(&env).await;

    // Matching: one strong result with the expected explanations.
    let matches = env.matching.matches_for_lost(&owner, lost.id).await.unwrap();
    assert_eq!(matches.len(), 1);
    let top = &matches[0];
    assert_eq!(top.found_item_id, found.id);
    assert!(top.score >= 13, "score was {}", top.score);
    assert!(top.explanations.contains(&"Category match".to_string()));
    assert!(top.explanations.contains(&"Same location".to_string()));
    assert!(top.explanations.contains(&"Within 24 hours".to_string()));

    // Questions are readable by the claimant.
    let questions = env.claims.questions(&owner, claim.id).await.unwrap();
    assert_eq!(questions.len(), 3);

    // Verification: casing/punctuation variants of the stored answers pass.
    let outcome = env
        .claims
        .verify(
            &owner,
            claim.id,
            vec!["Mountains".into(), "3".into(), "Spotify".into()],
        )
        .await
        .unwrap();
    assert!(outcome.passed);
    assert_eq!(outcome.correct, 3);

    let claim_now = env.store.claim_by_id(claim.id).await.unwrap().unwrap();
    assert_eq!(claim_now.status, ClaimStatus::Verified);
    assert_eq!(
        env.store.lost_by_id(lost.id).await.unwrap().unwrap().status,
        LostStatus::Claimed
    );
    assert_eq!(
        env.store.found_by_id(found.id).await.unwrap().unwrap().status,
        FoundStatus::Matched
    );

    // Mint: six decimal digits, returned exactly once.
    let minted = env.handover.mint(&owner, claim.id).await.unwrap();
    assert_eq!(minted.otp.len(), 6);
    assert!(minted.otp.chars().all(|c| c.is_ascii_digit()));

    // Redeem by the finder.
    let returned = env
        .handover
        .redeem(&finder, claim.id, &minted.otp)
        .await
        .unwrap();
    assert_eq!(returned.status, ClaimStatus::Returned);
    assert_eq!(
        env.store.lost_by_id(lost.id).await.unwrap().unwrap().status,
        LostStatus::Returned
    );
    assert_eq!(
        env.store.found_by_id(found.id).await.unwrap().unwrap().status,
        FoundStatus::Returned
    );

    // Trust deltas: +3 finder, +2 owner.
    assert_eq!(reload(&env, &finder).await.user.trust_score, 3);
    assert_eq!(reload(&env, &owner).await.user.trust_score, 2);

    // The confirmation is verified and its redeemer is not the claimant.
    let confirmation = env
        .store
        .confirmation_for(claim.id)
        .await
        .unwrap()
        .unwrap();
    assert!(confirmation.verified);
    assert_eq!(confirmation.redeemed_by, Some(finder.id()));
    assert_ne!(confirmation.redeemed_by, Some(owner.id()));
}

// ============================================================================
// Scenario 2: two of three answers suffice
// ============================================================================

#[tokio::test]
async fn test_two_of_three_passes() {
    let env = env();
    let (owner, _finder, lost, found, claim) = seeded_claim(&env).await;

    let outcome = env
        .claims
        .verify(
            &owner,
            claim.id,
            vec!["mountains".into(), "4".into(), "spotify".into()],
        )
        .await
        .unwrap();
    assert!(outcome.passed);
    assert_eq!(outcome.correct, 2);
    assert!((outcome.verification_score - 2.0 / 3.0).abs() < 1e-9);

    assert_eq!(
        env.store.claim_by_id(claim.id).await.unwrap().unwrap().status,
        ClaimStatus::Verified
    );
    assert_eq!(
        env.store.lost_by_id(lost.id).await.unwrap().unwrap().status,
        LostStatus::Claimed
    );
    assert_eq!(
        env.store.found_by_id(found.id).await.unwrap().unwrap().status,
        FoundStatus::Matched
    );
}

// ============================================================================
// Scenario 3: cooldown after the first failure
// ============================================================================

#[tokio::test]
async fn test_cooldown_after_first_failure() {
    let env = env();
    let (owner, _finder, _lost, _found, claim) = seeded_claim(&env).await;

    let before = Utc::now();
    let outcome = env
        .claims
        .verify(&owner, claim.id, vec!["x".into(), "y".into(), "z".into()])
        .await
        .unwrap();
    assert!(!outcome.passed);
    assert_eq!(outcome.correct, 0);

    let claim_now = env.store.claim_by_id(claim.id).await.unwrap().unwrap();
    assert_eq!(claim_now.status, ClaimStatus::Pending);
    assert_eq!(claim_now.consecutive_failures, 1);

    // next_attempt_at − attempt time = 1h, within a second of tolerance.
    let deadline = claim_now.next_attempt_at.expect("cooldown must be set");
    let offset = deadline - before;
    assert!(
        (offset - Duration::hours(1)).num_seconds().abs() <= 1,
        "cooldown offset was {:?}",
        offset
    );

    // Failed verification costs 2 trust points.
    assert_eq!(reload(&env, &owner).await.user.trust_score, -2);

    // A second attempt inside the window is refused and mutates nothing.
    let attempts_before = env
        .store
        .attempts_since(claim.id, Utc::now() - Duration::days(1))
        .await
        .unwrap();
    let refused = env
        .claims
        .verify(
            &owner,
            claim.id,
            vec!["mountains".into(), "3".into(), "spotify".into()],
        )
        .await;
    assert!(matches!(refused, Err(DomainError::Cooldown { .. })));

    let attempts_after = env
        .store
        .attempts_since(claim.id, Utc::now() - Duration::days(1))
        .await
        .unwrap();
    assert_eq!(attempts_before, attempts_after);
    assert_eq!(reload(&env, &owner).await.user.trust_score, -2);
}

// ============================================================================
// Scenario 4: wrong code twice, right code once
// ============================================================================

#[tokio::test]
async fn test_redeem_wrong_twice_then_right() {
    let env = env();
    let (owner, finder, _lost, _found, claim) = seeded_claim(&env).await;

    env.claims
        .verify(
            &owner,
            claim.id,
            vec!["mountains".into(), "3".into(), "spotify".into()],
        )
        .await
        .unwrap();
    let minted = env.handover.mint(&owner, claim.id).await.unwrap();

    let wrong = if minted.otp == "000000" { "000001" } else { "000000" };

    let first = env.handover.redeem(&finder, claim.id, wrong).await;
    match first {
        Err(DomainError::InvalidInput { message, .. }) => {
            assert!(message.contains("2 attempts remaining"), "{}", message);
        }
        other => panic!("expected invalid-code error, got {:?}", other.map(|c| c.status)),
    }

    let second = env.handover.redeem(&finder, claim.id, wrong).await;
    match second {
        Err(DomainError::InvalidInput { message, .. }) => {
            assert!(message.contains("1 attempts remaining"), "{}", message);
        }
        other => panic!("expected invalid-code error, got {:?}", other.map(|c| c.status)),
    }

    let third = env
        .handover
        .redeem(&finder, claim.id, &minted.otp)
        .await
        .unwrap();
    assert_eq!(third.status, ClaimStatus::Returned);
}

// ============================================================================
// Scenario 5: the owner cannot redeem, even with the right code
// ============================================================================

#[tokio::test]
async fn test_owner_cannot_redeem() {
    let env = env();
    let (owner, _finder, _lost, _found, claim) = seeded_claim(&env).await;

    env.claims
        .verify(
            &owner,
            claim.id,
            vec!["mountains".into(), "3".into(), "spotify".into()],
        )
        .await
        .unwrap();
    let minted = env.handover.mint(&owner, claim.id).await.unwrap();

    let refused = env.handover.redeem(&owner, claim.id, &minted.otp).await;
    match refused {
        Err(DomainError::Forbidden(message)) => {
            assert_eq!(message, OWNER_REDEEM_MESSAGE);
        }
        other => panic!("expected Forbidden, got {:?}", other.map(|c| c.status)),
    }

    // Nothing moved: the confirmation is untouched, the claim still Verified.
    let confirmation = env
        .store
        .confirmation_for(claim.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!confirmation.verified);
    assert_eq!(confirmation.attempts, 0);
    assert_eq!(
        env.store.claim_by_id(claim.id).await.unwrap().unwrap().status,
        ClaimStatus::Verified
    );
}

// ============================================================================
// Redeem idempotence
// ============================================================================

#[tokio::test]
async fn test_second_redeem_is_conflict_without_side_effects() {
    let env = env();
    let (owner, finder, _lost, _found, claim) = seeded_claim(&env).await;

    env.claims
        .verify(
            &owner,
            claim.id,
            vec!["mountains".into(), "3".into(), "spotify".into()],
        )
        .await
        .unwrap();
    let minted = env.handover.mint(&owner, claim.id).await.unwrap();
    env.handover
        .redeem(&finder, claim.id, &minted.otp)
        .await
        .unwrap();

    let finder_score = reload(&env, &finder).await.user.trust_score;

    let again = env.handover.redeem(&finder, claim.id, &minted.otp).await;
    assert!(matches!(again, Err(DomainError::Conflict(_))));

    // No double credit.
    assert_eq!(reload(&env, &finder).await.user.trust_score, finder_score);
}

// ============================================================================
// Scenario 6: auto-ban at the trust floor
// ============================================================================

#[tokio::test]
async fn test_auto_ban_crossing_trust_floor() {
    let env = env();
    let actor = citizen(&env, "sinking").await;

    // Put the account at -8, then confirm a scam against it.
    let mut user = actor.user.clone();
    user.trust_score = -8;
    env.mem.put_user(user);

    let event = env
        .trust
        .apply(actor.id(), byaboneka_core::trust::TrustReason::ScamConfirmed)
        .await
        .unwrap();
    assert_eq!(event.new_score, -28);

    let banned = reload(&env, &actor).await.user;
    assert!(banned.is_banned);
    assert_eq!(banned.ban_reason.as_deref(), Some("low trust"));

    // Authenticated calls now fail with the suspension message.
    let refused = env
        .auth
        .login(&banned.email, "passw0rd123", None)
        .await;
    match refused {
        Err(DomainError::Forbidden(message)) => {
            assert_eq!(message, "Account has been suspended");
        }
        other => panic!("expected Forbidden, got {:?}", other.map(|_| ())),
    }
}

// ============================================================================
// Disputes
// ============================================================================

#[tokio::test]
async fn test_dispute_fork_and_resolution() {
    let env = env();
    let (owner, finder, lost, found, claim) = seeded_claim(&env).await;

    // Finder disputes the pending claim.
    let dispute = env
        .claims
        .open_dispute(&finder, claim.id, "That phone is not theirs".into())
        .await
        .unwrap();
    assert_eq!(
        env.store.claim_by_id(claim.id).await.unwrap().unwrap().status,
        ClaimStatus::Disputed
    );

    // Second dispute on the same claim is refused.
    let second = env
        .claims
        .open_dispute(&owner, claim.id, "counter".into())
        .await;
    assert!(second.is_err());

    // Outsiders cannot resolve.
    let outsider = citizen(&env, "outsider").await;
    assert!(env
        .claims
        .resolve_dispute(&outsider, dispute.id, DisputeResolution::ResolvedOwner, None)
        .await
        .is_err());

    // An admin rules for the owner: claim lands Verified, items aligned.
    let mut admin_user = citizen(&env, "admin").await.user;
    admin_user.role = Role::Admin;
    env.mem.put_user(admin_user.clone());
    let admin = Actor::new(admin_user, None);

    let resolved = env
        .claims
        .resolve_dispute(&admin, dispute.id, DisputeResolution::ResolvedOwner, None)
        .await
        .unwrap();
    assert_eq!(resolved.status, ClaimStatus::Verified);
    assert_eq!(
        env.store.lost_by_id(lost.id).await.unwrap().unwrap().status,
        LostStatus::Claimed
    );
    assert_eq!(
        env.store.found_by_id(found.id).await.unwrap().unwrap().status,
        FoundStatus::Matched
    );

    // Vindicated claimant gains the accurate-report credit.
    assert_eq!(reload(&env, &owner).await.user.trust_score, 1);
}

// ============================================================================
// Claim admission guards
// ============================================================================

#[tokio::test]
async fn test_open_claim_guards() {
    let env = env();
    let owner = citizen(&env, "owner2").await;
    let finder = citizen(&env, "finder2").await;
    let stranger = citizen(&env, "stranger").await;

    let lost = env
        .items
        .report_lost(&owner, iphone_lost_request())
        .await
        .unwrap();
    let found = env
        .items
        .report_found(&finder, iphone_found_request())
        .await
        .unwrap();

    // Only the lost item's owner may open the claim.
    assert!(matches!(
        env.claims.open_claim(&stranger, lost.id, found.id).await,
        Err(DomainError::Forbidden(_))
    ));

    // Duplicate live claim is a conflict.
    env.claims.open_claim(&owner, lost.id, found.id).await.unwrap();
    assert!(matches!(
        env.claims.open_claim(&owner, lost.id, found.id).await,
        Err(DomainError::Conflict(_))
    ));
}

// ============================================================================
// Trust ledger invariant
// ============================================================================

#[tokio::test]
async fn test_ledger_matches_materialized_score() {
    let env = env();
    let (owner, finder, _lost, _found, claim) = seeded_claim(&env).await;

    // One failure, then a pass, then the full handover.
    env.claims
        .verify(&owner, claim.id, vec!["a".into(), "b".into(), "c".into()])
        .await
        .unwrap();

    // Clear the cooldown to continue the scenario.
    let mut row = env.store.claim_by_id(claim.id).await.unwrap().unwrap();
    row.next_attempt_at = None;
    env.mem.put_claim(row);

    env.claims
        .verify(
            &owner,
            claim.id,
            vec!["mountains".into(), "3".into(), "spotify".into()],
        )
        .await
        .unwrap();
    let minted = env.handover.mint(&owner, claim.id).await.unwrap();
    env.handover
        .redeem(&finder, claim.id, &minted.otp)
        .await
        .unwrap();

    for actor in [&owner, &finder] {
        let user = reload(&env, actor).await.user;
        let events = env.store.trust_events_for(user.id).await.unwrap();
        let replayed = byaboneka_core::trust::recompute(events.iter().map(|e| e.delta));
        assert_eq!(
            replayed, user.trust_score,
            "ledger and materialized score diverged for {}",
            user.email
        );

        let report = env.trust.recompute(user.id, user.id).await.unwrap();
        assert!(report.consistent);
    }
}
