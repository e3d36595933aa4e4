//! Matching cache behavior, tier caps, scam reports and the reaper.

mod common;

use chrono::{Duration, Utc};
use common::{citizen, env, reload};

use byaboneka_core::error::DomainError;
use byaboneka_core::types::*;
use byaboneka_service::items::{QuestionPair, ReportFoundRequest, ReportLostRequest};
use byaboneka_service::reaper::{run_reaper_cycle, ReaperConfig};
use byaboneka_service::Actor;

fn lost_request(title: &str, area: &str) -> ReportLostRequest {
    ReportLostRequest {
        category: Category::Bag,
        title: title.into(),
        description: format!("{} with notebooks and a charger inside", title),
        location_area: area.into(),
        lost_date: Utc::now(),
        verification_questions: vec![
            QuestionPair {
                q: "Color of the zipper?".into(),
                a: "red".into(),
            },
            QuestionPair {
                q: "Brand?".into(),
                a: "nike".into(),
            },
            QuestionPair {
                q: "What is inside?".into(),
                a: "notebooks".into(),
            },
        ],
    }
}

fn found_request(title: &str, area: &str) -> ReportFoundRequest {
    ReportFoundRequest {
        category: Category::Bag,
        title: title.into(),
        description: format!("{} left on a seat, handed to the stage office", title),
        location_area: area.into(),
        found_date: Utc::now(),
        image_urls: vec![],
        cooperative_id: None,
    }
}

// ============================================================================
// Matching cache
// ============================================================================

#[tokio::test]
async fn test_cache_hit_and_stale_recompute() {
    let env = env();
    let owner = citizen(&env, "bagowner").await;
    let finder = citizen(&env, "bagfinder").await;

    let lost = env
        .items
        .report_lost(&owner, lost_request("Black Nike backpack", "Remera"))
        .await
        .unwrap();

    // First read computes and caches: no candidates yet.
    let empty = env.matching.matches_for_lost(&owner, lost.id).await.unwrap();
    assert!(empty.is_empty());
    let first_stamp = env
        .store
        .cache_get(lost.id)
        .await
        .unwrap()
        .unwrap()
        .computed_at;

    // A new found item appears; the fresh cache still answers (advisory).
    env.items
        .report_found(&finder, found_request("Nike backpack black", "Remera"))
        .await
        .unwrap();
    let cached = env.matching.matches_for_lost(&owner, lost.id).await.unwrap();
    assert!(cached.is_empty(), "fresh cache row must be served as-is");

    // Age the cache row past the TTL: the read recomputes and sees the item.
    let mut row = env.store.cache_get(lost.id).await.unwrap().unwrap();
    row.computed_at = Utc::now() - Duration::hours(2);
    env.store.cache_put(&row).await.unwrap();

    let recomputed = env.matching.matches_for_lost(&owner, lost.id).await.unwrap();
    assert_eq!(recomputed.len(), 1);
    assert!(recomputed[0].score >= 13); // category + same area + same day + keywords

    let second_stamp = env
        .store
        .cache_get(lost.id)
        .await
        .unwrap()
        .unwrap()
        .computed_at;
    assert!(second_stamp > first_stamp, "cache row must be replaced");
}

#[tokio::test]
async fn test_low_scores_filtered_out() {
    let env = env();
    let owner = citizen(&env, "filterowner").await;
    let finder = citizen(&env, "filterfinder").await;

    let lost = env
        .items
        .report_lost(&owner, lost_request("Black Nike backpack", "Remera"))
        .await
        .unwrap();

    // Same category but nothing else in common and 20 days of distance
    // would fall below the floor; here the date window already excludes it.
    let mut req = found_request("Umbrella holder", "Huye");
    req.found_date = Utc::now() + Duration::days(20);
    env.items.report_found(&finder, req).await.unwrap();

    let mut row = env.store.cache_get(lost.id).await.unwrap();
    if let Some(ref mut cached) = row {
        cached.computed_at = Utc::now() - Duration::hours(2);
        env.store.cache_put(cached).await.unwrap();
    }
    let results = env.matching.matches_for_lost(&owner, lost.id).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_matches_are_owner_only() {
    let env = env();
    let owner = citizen(&env, "privowner").await;
    let stranger = citizen(&env, "privstranger").await;

    let lost = env
        .items
        .report_lost(&owner, lost_request("Black Nike backpack", "Remera"))
        .await
        .unwrap();

    assert!(matches!(
        env.matching.matches_for_lost(&stranger, lost.id).await,
        Err(DomainError::Forbidden(_))
    ));
}

// ============================================================================
// Tier caps
// ============================================================================

#[tokio::test]
async fn test_report_cap_for_new_tier() {
    let env = env();
    let actor = citizen(&env, "prolific").await;

    // Tier::New allows 3 reports per day.
    for i in 0..3 {
        env.items
            .report_lost(&actor, lost_request(&format!("Backpack number {}", i), "Remera"))
            .await
            .unwrap();
    }
    let fourth = env
        .items
        .report_lost(&actor, lost_request("One bag too many", "Remera"))
        .await;
    assert!(matches!(fourth, Err(DomainError::RateLimited { .. })));
}

#[tokio::test]
async fn test_suspended_tier_cannot_claim() {
    let env = env();
    let owner = citizen(&env, "frozenowner").await;
    let finder = citizen(&env, "frozenfinder").await;

    let lost = env
        .items
        .report_lost(&owner, lost_request("Black Nike backpack", "Remera"))
        .await
        .unwrap();
    let found = env
        .items
        .report_found(&finder, found_request("Nike backpack", "Remera"))
        .await
        .unwrap();

    // Sink the owner's score below the suspended line, then try to claim.
    let mut user = reload(&env, &owner).await.user;
    user.trust_score = -12;
    user.is_banned = false; // tier gate, not the ban, is under test
    env.mem.put_user(user.clone());
    let suspended = Actor::new(user, None);

    let refused = env.claims.open_claim(&suspended, lost.id, found.id).await;
    assert!(matches!(refused, Err(DomainError::RateLimited { .. })));
}

// ============================================================================
// Scam reports
// ============================================================================

#[tokio::test]
async fn test_scam_report_flow_with_heuristic() {
    let env = env();
    let reporter = citizen(&env, "reporter").await;
    let accused = citizen(&env, "accused").await;

    let report = env
        .reports
        .report_scam(
            &reporter,
            accused.id(),
            None,
            "He said: send 5000 RWF first, then I give you the phone".into(),
        )
        .await
        .unwrap();
    assert!(report.flagged, "payment + conditional terms must flag");

    // Filing costs the accused 5 points immediately.
    assert_eq!(reload(&env, &accused).await.user.trust_score, -5);

    // Admin confirms: -20 to the accused, +1 to the reporter.
    let mut admin_user = citizen(&env, "modadmin").await.user;
    admin_user.role = Role::Admin;
    env.mem.put_user(admin_user.clone());
    let admin = Actor::new(admin_user, None);

    env.reports
        .resolve(&admin, report.id, ReportStatus::Confirmed)
        .await
        .unwrap();

    let accused_now = reload(&env, &accused).await.user;
    assert_eq!(accused_now.trust_score, -25);
    assert!(accused_now.is_banned, "crossing the floor bans automatically");
    assert_eq!(reload(&env, &reporter).await.user.trust_score, 1);

    // A second ruling on the same report is refused.
    assert!(env
        .reports
        .resolve(&admin, report.id, ReportStatus::Confirmed)
        .await
        .is_err());
}

#[tokio::test]
async fn test_false_report_penalizes_reporter() {
    let env = env();
    let reporter = citizen(&env, "liar").await;
    let accused = citizen(&env, "innocent").await;

    let report = env
        .reports
        .report_scam(&reporter, accused.id(), None, "A plain accusation".into())
        .await
        .unwrap();
    assert!(!report.flagged);

    let mut admin_user = citizen(&env, "modadmin2").await.user;
    admin_user.role = Role::Admin;
    env.mem.put_user(admin_user.clone());
    let admin = Actor::new(admin_user, None);

    env.reports
        .resolve(&admin, report.id, ReportStatus::DismissedFalse)
        .await
        .unwrap();
    assert_eq!(reload(&env, &reporter).await.user.trust_score, -3);
}

// ============================================================================
// Reaper
// ============================================================================

#[tokio::test]
async fn test_reaper_expires_stale_claims_and_items() {
    let env = env();
    let owner = citizen(&env, "reapowner").await;
    let finder = citizen(&env, "reapfinder").await;

    let lost = env
        .items
        .report_lost(&owner, lost_request("Black Nike backpack", "Remera"))
        .await
        .unwrap();
    let found = env
        .items
        .report_found(&finder, found_request("Nike backpack", "Remera"))
        .await
        .unwrap();
    let claim = env
        .claims
        .open_claim(&owner, lost.id, found.id)
        .await
        .unwrap();

    // Backdate the claim past the 7-day TTL.
    let mut row = env.store.claim_by_id(claim.id).await.unwrap().unwrap();
    row.created_at = Utc::now() - Duration::days(8);
    env.mem.put_claim(row);

    run_reaper_cycle(&env.store, &ReaperConfig::default()).await;

    assert_eq!(
        env.store.claim_by_id(claim.id).await.unwrap().unwrap().status,
        ClaimStatus::Expired
    );
    // Items were touched recently, so the 30-day sweep leaves them alone.
    assert_eq!(
        env.store.lost_by_id(lost.id).await.unwrap().unwrap().status,
        LostStatus::Active
    );
}
