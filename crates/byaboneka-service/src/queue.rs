//! Bounded background matching queue.
//!
//! Publication of an item enqueues a job; the worker drains them under a
//! per-job budget. The channel is bounded so a publisher surge cannot grow
//! memory without limit — on a full queue the job is dropped with a warning
//! and the next cache read recomputes synchronously instead.

use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::matching::MatchingService;

/// Jobs waiting at most; beyond this, publishers drop.
pub const QUEUE_CAPACITY: usize = 256;

/// Per-job compute budget.
pub const DEFAULT_JOB_BUDGET: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub enum MatchJob {
    LostPublished(Uuid),
    FoundPublished(Uuid),
}

#[derive(Clone)]
pub struct MatchQueue {
    tx: mpsc::Sender<MatchJob>,
}

impl MatchQueue {
    /// Build the queue pair. The receiver goes to [`run_match_worker`].
    pub fn new() -> (Self, mpsc::Receiver<MatchJob>) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        (Self { tx }, rx)
    }

    /// Schedule matching for a lost item. Never fails: scheduling problems
    /// are the queue's to log, not the publisher's to see.
    pub fn enqueue_lost(&self, lost_item_id: Uuid) {
        self.enqueue(MatchJob::LostPublished(lost_item_id));
    }

    /// Schedule cache refreshes for a found item.
    pub fn enqueue_found(&self, found_item_id: Uuid) {
        self.enqueue(MatchJob::FoundPublished(found_item_id));
    }

    fn enqueue(&self, job: MatchJob) {
        if let Err(err) = self.tx.try_send(job) {
            tracing::warn!(job = ?err.into_inner(), "match queue full, job dropped");
        }
    }
}

/// Drain the queue until every sender is gone. Each job runs under the
/// budget; overruns are abandoned with a warning and the next read repairs
/// the cache synchronously.
pub async fn run_match_worker(
    matching: MatchingService,
    mut rx: mpsc::Receiver<MatchJob>,
    budget: Duration,
) {
    tracing::info!(capacity = QUEUE_CAPACITY, budget_ms = budget.as_millis() as u64, "match worker started");

    while let Some(job) = rx.recv().await {
        let result = match job {
            MatchJob::LostPublished(id) => {
                tokio::time::timeout(budget, matching.refresh_lost(id)).await
            }
            MatchJob::FoundPublished(id) => {
                tokio::time::timeout(budget, matching.refresh_for_found(id)).await
            }
        };

        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(job = ?job, error = %err, "match job failed");
            }
            Err(_) => {
                tracing::warn!(job = ?job, budget_ms = budget.as_millis() as u64, "match job exceeded budget, abandoned");
            }
        }
    }

    tracing::info!("match worker stopped: queue closed");
}
