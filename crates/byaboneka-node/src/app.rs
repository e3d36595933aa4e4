//! Service graph construction.

use std::sync::Arc;
use std::time::Duration;

use byaboneka_api::ApiContext;
use byaboneka_service::auth::{AuthConfig, AuthService};
use byaboneka_service::claims::ClaimService;
use byaboneka_service::fraud::FraudGate;
use byaboneka_service::handover::HandoverService;
use byaboneka_service::items::ItemService;
use byaboneka_service::matching::MatchingService;
use byaboneka_service::notify::{Notifier, TracingNotifier};
use byaboneka_service::queue::{MatchJob, MatchQueue};
use byaboneka_service::reports::ReportService;
use byaboneka_service::trust::TrustService;
use byaboneka_service::DynStore;
use tokio::sync::mpsc;

use crate::config::NodeConfig;

pub struct App {
    pub ctx: ApiContext,
    pub matching: MatchingService,
    pub queue_rx: mpsc::Receiver<MatchJob>,
    pub match_budget: Duration,
}

/// Wire every service over one store handle.
pub fn build(config: &NodeConfig, store: DynStore) -> App {
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);

    let trust = TrustService::new(store.clone());
    let fraud = FraudGate::new(store.clone());
    let (queue, queue_rx) = MatchQueue::new();

    let auth = AuthService::new(
        store.clone(),
        AuthConfig {
            access_secret: config.access_secret.clone().into_bytes(),
            refresh_secret: config.refresh_secret.clone().into_bytes(),
        },
        trust.clone(),
        notifier.clone(),
    );
    let items = ItemService::new(store.clone(), fraud.clone(), queue.clone());
    let matching = MatchingService::new(store.clone(), notifier.clone());
    let claims = ClaimService::new(store.clone(), fraud.clone(), trust.clone(), notifier.clone());
    let handover = HandoverService::new(store.clone(), fraud.clone(), trust.clone(), notifier);
    let reports = ReportService::new(store.clone(), fraud, trust.clone());

    let ctx = ApiContext {
        auth: Arc::new(auth),
        items: Arc::new(items),
        matching: Arc::new(matching.clone()),
        claims: Arc::new(claims),
        handover: Arc::new(handover),
        reports: Arc::new(reports),
        trust: Arc::new(trust),
    };

    App {
        ctx,
        matching,
        queue_rx,
        match_budget: Duration::from_millis(config.match_budget_ms),
    }
}
