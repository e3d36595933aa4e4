//! Byaboneka service layer.
//!
//! Orchestration on top of the core domain and the storage traits:
//!   • authentication and token lifecycle
//!   • item reporting with secret sets and keyword derivation
//!   • the claim service — the single writer for any claim row
//!   • OTP handover
//!   • matching with TTL cache and a bounded background queue
//!   • fraud gating, trust ledger writes, scam reports
//!   • the daily reaper
//!
//! Services hold `Arc<dyn Store>`; production wires the PostgreSQL store,
//! the test suites wire the in-memory twin. User identity travels as an
//! explicit [`Actor`] through every call; nothing reads ambient state.

pub mod auth;
pub mod claims;
pub mod fraud;
pub mod handover;
pub mod items;
pub mod matching;
pub mod notify;
pub mod queue;
pub mod reaper;
pub mod reports;
pub mod trust;

use std::sync::Arc;

use byaboneka_core::error::DomainError;
use byaboneka_core::store::Store;
use byaboneka_core::types::{AuditEntry, User};
use chrono::Utc;
use uuid::Uuid;

/// Shared handle to the storage backend.
pub type DynStore = Arc<dyn Store>;

/// The authenticated caller plus request context. Built once per request by
/// the API layer and passed explicitly into every service operation.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user: User,
    pub ip: Option<String>,
}

impl Actor {
    pub fn new(user: User, ip: Option<String>) -> Self {
        Self { user, ip }
    }

    pub fn id(&self) -> Uuid {
        self.user.id
    }
}

/// Fold a storage failure into the opaque transient-store error.
pub(crate) fn store_err(err: anyhow::Error) -> DomainError {
    DomainError::store(err)
}

/// Best-effort audit append. Audit failures are logged and swallowed; they
/// never change the outcome of the operation they attended.
pub(crate) async fn audit(
    store: &DynStore,
    actor_id: Option<Uuid>,
    action: &str,
    entity: &str,
    entity_id: Option<Uuid>,
    detail: serde_json::Value,
) {
    let entry = AuditEntry {
        id: Uuid::new_v4(),
        actor_id,
        action: action.to_string(),
        entity: entity.to_string(),
        entity_id,
        detail,
        created_at: Utc::now(),
    };
    if let Err(err) = store.append_audit(&entry).await {
        tracing::warn!(action = action, error = %err, "audit append failed");
    }
}
