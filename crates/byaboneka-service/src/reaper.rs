//! Daily reaper for stale items and claims.
//!
//! Runs on a configurable interval and works in bounded batches so it never
//! holds long-lived locks:
//!   • pending claims older than 7 days → Expired
//!   • active/unclaimed items untouched for 30 days → Expired

use chrono::{Duration as ChronoDuration, Utc};
use tokio::time::{interval, Duration};

use byaboneka_core::claim::{CLAIM_TTL_DAYS, ITEM_TTL_DAYS};

use crate::DynStore;

pub struct ReaperConfig {
    pub interval: Duration,
    pub item_ttl_days: i64,
    pub claim_ttl_days: i64,
    pub batch_size: i64,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(24 * 3600),
            item_ttl_days: ITEM_TTL_DAYS,
            claim_ttl_days: CLAIM_TTL_DAYS,
            batch_size: 500,
        }
    }
}

pub async fn run_reaper(store: DynStore, config: ReaperConfig) {
    let mut ticker = interval(config.interval);

    tracing::info!(
        interval_secs = config.interval.as_secs(),
        item_ttl_days = config.item_ttl_days,
        claim_ttl_days = config.claim_ttl_days,
        batch = config.batch_size,
        "reaper started"
    );

    loop {
        ticker.tick().await;
        run_reaper_cycle(&store, &config).await;
    }
}

/// One sweep; separated out so tests can drive it directly.
pub async fn run_reaper_cycle(store: &DynStore, config: &ReaperConfig) {
    let now = Utc::now();

    let claim_cutoff = now - ChronoDuration::days(config.claim_ttl_days);
    match store.expire_stale_claims(claim_cutoff, config.batch_size).await {
        Ok(expired) if expired > 0 => {
            tracing::info!(expired, "reaper expired stale pending claims");
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(error = %err, "reaper claim sweep failed"),
    }

    let item_cutoff = now - ChronoDuration::days(config.item_ttl_days);
    match store.expire_stale_items(item_cutoff, config.batch_size).await {
        Ok(expired) if expired > 0 => {
            tracing::info!(expired, "reaper archived stale items");
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(error = %err, "reaper item sweep failed"),
    }
}
