//! Matching engine scoring.
//!
//! Deterministic, additive, explainable. Every factor appends a human
//! explanation string so a support operator can answer "why did these two
//! match" without reading code. Candidate retrieval and caching live in the
//! service/store layers; this module only scores.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzer::{area_distance, keyword_overlap};
use crate::types::{FoundItem, LostItem};

/// Results below this score are discarded.
pub const MIN_MATCH_SCORE: u32 = 5;

/// At most this many results per lost item.
pub const MAX_RESULTS: usize = 5;

/// Candidate scan cap per scoring pass.
pub const MAX_CANDIDATES: i64 = 100;

/// Candidate window around the anchor date, either direction.
pub const CANDIDATE_WINDOW_DAYS: i64 = 7;

/// Cache rows older than this are stale.
pub const CACHE_TTL_SECS: i64 = 3600;

/// A new found item refreshes at most this many recent lost items.
pub const FOUND_REFRESH_LIMIT: i64 = 20;

/// Keyword overlap contributes at most this many points.
const MAX_KEYWORD_BONUS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub score: u32,
    pub explanations: Vec<String>,
}

/// Score one (lost, found) pair.
///
/// Category acts as a gate: on mismatch the score is 0 and no further
/// factor is evaluated.
pub fn score_pair(lost: &LostItem, found: &FoundItem) -> MatchScore {
    if lost.category != found.category {
        return MatchScore {
            score: 0,
            explanations: vec!["Category mismatch".to_string()],
        };
    }

    let mut score = 5;
    let mut explanations = vec!["Category match".to_string()];

    // Location factor
    match area_distance(&lost.location_area, &found.location_area) {
        0 => {
            score += 5;
            explanations.push("Same location".to_string());
        }
        1 => {
            score += 3;
            explanations.push("Adjacent location".to_string());
        }
        2 => {
            score += 1;
            explanations.push("Same district".to_string());
        }
        _ => {}
    }

    // Temporal factor: found on or after lost, or within a 24h skew either way
    if let Some(bonus) = temporal_bonus(lost.lost_date, found.found_date) {
        score += bonus.0;
        explanations.push(bonus.1.to_string());
    }

    // Keyword overlap, capped
    let shared = keyword_overlap(&lost.keywords, &found.keywords) as u32;
    let keyword_bonus = shared.min(MAX_KEYWORD_BONUS);
    if keyword_bonus > 0 {
        score += keyword_bonus;
        explanations.push(format!("{} shared keywords", keyword_bonus));
    }

    MatchScore {
        score,
        explanations,
    }
}

fn temporal_bonus(
    lost: DateTime<Utc>,
    found: DateTime<Utc>,
) -> Option<(u32, &'static str)> {
    let delta_hours = (found - lost).num_hours();
    if delta_hours < -24 {
        // Found long before the loss was even reported: not the same event.
        return None;
    }
    match delta_hours.abs() {
        0..=24 => Some((3, "Within 24 hours")),
        25..=72 => Some((2, "Within 3 days")),
        73..=168 => Some((1, "Within 7 days")),
        _ => None,
    }
}

/// Candidate filter: counterpart dated within ±7 days of the anchor.
pub fn within_candidate_window(anchor: DateTime<Utc>, candidate: DateTime<Utc>) -> bool {
    let window = Duration::days(CANDIDATE_WINDOW_DAYS);
    candidate >= anchor - window && candidate <= anchor + window
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::extract_keywords;
    use crate::types::{Category, FoundSource, FoundStatus, LostStatus};
    use uuid::Uuid;

    fn lost(category: Category, area: &str, text: &str, at: DateTime<Utc>) -> LostItem {
        LostItem {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            category,
            title: text.to_string(),
            description: text.to_string(),
            location_area: area.to_string(),
            lost_date: at,
            keywords: extract_keywords(text, Some(category)),
            status: LostStatus::Active,
            created_at: at,
            updated_at: at,
        }
    }

    fn found(category: Category, area: &str, text: &str, at: DateTime<Utc>) -> FoundItem {
        FoundItem {
            id: Uuid::new_v4(),
            finder_id: Uuid::new_v4(),
            cooperative_id: None,
            category,
            title: text.to_string(),
            description: text.to_string(),
            location_area: area.to_string(),
            found_date: at,
            keywords: extract_keywords(text, Some(category)),
            image_urls: Vec::new(),
            status: FoundStatus::Unclaimed,
            source: FoundSource::Citizen,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_category_gate() {
        let now = Utc::now();
        let l = lost(Category::Electronics, "kimironko", "black iphone", now);
        let f = found(Category::Keys, "kimironko", "black iphone", now);

        let result = score_pair(&l, &f);
        assert_eq!(result.score, 0);
        assert_eq!(result.explanations, vec!["Category mismatch"]);
    }

    #[test]
    fn test_happy_path_scoring() {
        let now = Utc::now();
        let l = lost(
            Category::Electronics,
            "Kimironko",
            "Black iPhone 13 Pro",
            now,
        );
        let f = found(
            Category::Electronics,
            "kimironko",
            "iPhone Kimironko",
            now + Duration::hours(2),
        );

        let result = score_pair(&l, &f);
        // 5 category + 5 location + 3 temporal + shared "iphone"
        assert!(result.score >= 13, "score was {}", result.score);
        assert!(result.explanations.contains(&"Category match".to_string()));
        assert!(result.explanations.contains(&"Same location".to_string()));
        assert!(result
            .explanations
            .contains(&"Within 24 hours".to_string()));
    }

    #[test]
    fn test_adjacent_and_district_bonuses() {
        let now = Utc::now();
        let l = lost(Category::Bag, "kimironko", "leather backpack", now);

        let adjacent = found(Category::Bag, "remera", "backpack", now);
        assert!(score_pair(&l, &adjacent)
            .explanations
            .contains(&"Adjacent location".to_string()));

        let same_district = found(Category::Bag, "kacyiru", "backpack", now);
        assert!(score_pair(&l, &same_district)
            .explanations
            .contains(&"Same district".to_string()));
    }

    #[test]
    fn test_temporal_tiers() {
        let now = Utc::now();
        let l = lost(Category::Wallet, "remera", "brown wallet", now);

        let cases = [
            (Duration::hours(5), 3),
            (Duration::hours(48), 2),
            (Duration::hours(100), 1),
            (Duration::hours(200), 0),
        ];
        for (offset, expected_bonus) in cases {
            let f = found(Category::Wallet, "huye", "unrelated", now + offset);
            let base = 5; // category only; huye is unknown, no location bonus
            assert_eq!(
                score_pair(&l, &f).score,
                base + expected_bonus,
                "offset {:?}",
                offset
            );
        }
    }

    #[test]
    fn test_found_before_lost_rejected_beyond_skew() {
        let now = Utc::now();
        let l = lost(Category::Wallet, "remera", "brown wallet", now);

        // 12h before: within allowed skew
        let skewed = found(Category::Wallet, "huye", "x", now - Duration::hours(12));
        assert_eq!(score_pair(&l, &skewed).score, 5 + 3);

        // 3 days before: rejected
        let early = found(Category::Wallet, "huye", "x", now - Duration::days(3));
        assert_eq!(score_pair(&l, &early).score, 5);
    }

    #[test]
    fn test_keyword_bonus_capped() {
        let now = Utc::now();
        let text = "black leather wallet cash cards photos licence";
        let l = lost(Category::Wallet, "huye", text, now - Duration::days(20));
        let f = found(Category::Wallet, "musanze", text, now);

        // Far apart in time and space: only category + capped keywords
        let result = score_pair(&l, &f);
        assert_eq!(result.score, 5 + 5);
        assert!(result
            .explanations
            .contains(&"5 shared keywords".to_string()));
    }

    #[test]
    fn test_candidate_window() {
        let anchor = Utc::now();
        assert!(within_candidate_window(anchor, anchor));
        assert!(within_candidate_window(anchor, anchor + Duration::days(7)));
        assert!(within_candidate_window(anchor, anchor - Duration::days(7)));
        assert!(!within_candidate_window(anchor, anchor + Duration::days(8)));
    }
}
