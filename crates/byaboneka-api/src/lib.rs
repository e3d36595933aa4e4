//! HTTP surface for the Byaboneka+ core.
//!
//! Stateless axum handlers over the service layer, versioned under
//! `/api/v1` with bearer access tokens. The API maps the typed domain
//! errors onto the JSON error envelope and HTTP statuses; it makes no
//! decisions of its own.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;

pub use routes::build_router;

use std::sync::Arc;

use byaboneka_service::auth::AuthService;
use byaboneka_service::claims::ClaimService;
use byaboneka_service::handover::HandoverService;
use byaboneka_service::items::ItemService;
use byaboneka_service::matching::MatchingService;
use byaboneka_service::reports::ReportService;
use byaboneka_service::trust::TrustService;

/// Everything the handlers need, cloned per request.
#[derive(Clone)]
pub struct ApiContext {
    pub auth: Arc<AuthService>,
    pub items: Arc<ItemService>,
    pub matching: Arc<MatchingService>,
    pub claims: Arc<ClaimService>,
    pub handover: Arc<HandoverService>,
    pub reports: Arc<ReportService>,
    pub trust: Arc<TrustService>,
}
