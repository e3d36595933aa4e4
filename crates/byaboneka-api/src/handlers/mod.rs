//! Handler modules, one per resource family.
//!
//! Handlers are thin: extract, call the service, wrap in the envelope.
//! Guards, transactions and side effects all live below.

pub mod admin;
pub mod auth;
pub mod claims;
pub mod handover;
pub mod items;

use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// Liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
