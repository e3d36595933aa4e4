//! Shared fixtures for the service integration suites: every service wired
//! over the in-memory store, plus a notifier that captures reset tokens.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use byaboneka_core::types::{Claim, FoundItem, LostItem, User};
use byaboneka_service::auth::{AuthConfig, AuthService, RegisterRequest};
use byaboneka_service::claims::ClaimService;
use byaboneka_service::fraud::FraudGate;
use byaboneka_service::handover::HandoverService;
use byaboneka_service::items::ItemService;
use byaboneka_service::matching::MatchingService;
use byaboneka_service::notify::Notifier;
use byaboneka_service::queue::{MatchJob, MatchQueue};
use byaboneka_service::reports::ReportService;
use byaboneka_service::trust::TrustService;
use byaboneka_service::{Actor, DynStore};
use byaboneka_store::MemoryStore;
use tokio::sync::mpsc;

/// Notifier that records the last password-reset token for assertions.
#[derive(Clone, Default)]
pub struct CapturingNotifier {
    pub reset_tokens: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Notifier for CapturingNotifier {
    async fn match_found(&self, _owner: uuid::Uuid, _lost: &LostItem, _results: usize) {}
    async fn claim_opened(&self, _finder: &User, _claim: &Claim) {}
    async fn verification_result(&self, _claimant: &User, _claim: &Claim, _passed: bool) {}
    async fn handover_ready(&self, _finder: &User, _found: &FoundItem) {}
    async fn handover_confirmed(&self, _owner: &User, _finder: &User, _claim: &Claim) {}
    async fn dispute_update(&self, _claim: &Claim, _resolved: bool) {}
    async fn password_reset(&self, _user: &User, token: &str) {
        self.reset_tokens.lock().unwrap().push(token.to_string());
    }
}

pub struct TestEnv {
    pub mem: MemoryStore,
    pub store: DynStore,
    pub auth: AuthService,
    pub items: ItemService,
    pub matching: MatchingService,
    pub claims: ClaimService,
    pub handover: HandoverService,
    pub reports: ReportService,
    pub trust: TrustService,
    pub notifier: CapturingNotifier,
    /// Kept open so enqueues succeed; tests may drain it if they care.
    pub queue_rx: mpsc::Receiver<MatchJob>,
}

pub fn env() -> TestEnv {
    let mem = MemoryStore::new();
    let store: DynStore = Arc::new(mem.clone());
    let notifier = CapturingNotifier::default();
    let notifier_arc: Arc<dyn Notifier> = Arc::new(notifier.clone());

    let trust = TrustService::new(store.clone());
    let fraud = FraudGate::new(store.clone());
    let (queue, queue_rx) = MatchQueue::new();

    let auth = AuthService::new(
        store.clone(),
        AuthConfig {
            access_secret: b"test-access-secret-0123456789abcdef".to_vec(),
            refresh_secret: b"test-refresh-secret-0123456789abcdef".to_vec(),
        },
        trust.clone(),
        notifier_arc.clone(),
    );
    let items = ItemService::new(store.clone(), fraud.clone(), queue.clone());
    let matching = MatchingService::new(store.clone(), notifier_arc.clone());
    let claims = ClaimService::new(
        store.clone(),
        fraud.clone(),
        trust.clone(),
        notifier_arc.clone(),
    );
    let handover = HandoverService::new(
        store.clone(),
        fraud.clone(),
        trust.clone(),
        notifier_arc.clone(),
    );
    let reports = ReportService::new(store.clone(), fraud, trust.clone());

    TestEnv {
        mem,
        store,
        auth,
        items,
        matching,
        claims,
        handover,
        reports,
        trust,
        notifier,
        queue_rx,
    }
}

/// Register a citizen and wrap them as an actor with no IP.
pub async fn citizen(env: &TestEnv, tag: &str) -> Actor {
    let user = env
        .auth
        .register(RegisterRequest {
            email: format!("{}@test.rw", tag),
            password: "passw0rd123".into(),
            display_name: tag.to_string(),
            phone: None,
        })
        .await
        .expect("registration failed");
    Actor::new(user, None)
}

/// Re-read an actor's user row after mutations.
pub async fn reload(env: &TestEnv, actor: &Actor) -> Actor {
    let user = env
        .store
        .user_by_id(actor.id())
        .await
        .unwrap()
        .expect("user vanished");
    Actor::new(user, actor.ip.clone())
}
