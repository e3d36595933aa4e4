//! /admin endpoints: dispute resolution, user moderation, scam-report
//! rulings, trust recompute, audit queries.
//!
//! Role enforcement lives in the services; these handlers only shape I/O.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use byaboneka_core::types::{DisputeResolution, ReportStatus};

use crate::error::{ok, ApiResult};
use crate::extract::AuthUser;
use crate::ApiContext;

#[derive(Deserialize)]
pub struct ResolveDisputeRequest {
    pub resolution: DisputeResolution,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct BanRequest {
    pub reason: String,
}

#[derive(Deserialize)]
pub struct ResolveReportRequest {
    pub outcome: ReportStatus,
}

#[derive(Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn resolve_dispute(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ResolveDisputeRequest>,
) -> ApiResult {
    let claim = ctx
        .claims
        .resolve_dispute(&actor, id, req.resolution, req.notes)
        .await?;
    Ok(ok(json!({ "claim": claim })))
}

pub async fn ban_user(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<BanRequest>,
) -> ApiResult {
    ctx.reports.ban_user(&actor, id, &req.reason).await?;
    Ok(ok(json!({})))
}

pub async fn unban_user(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult {
    ctx.reports.unban_user(&actor, id).await?;
    Ok(ok(json!({})))
}

pub async fn list_scam_reports(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Query(query): Query<LimitQuery>,
) -> ApiResult {
    let reports = ctx.reports.open_reports(&actor, query.limit).await?;
    Ok(ok(json!({ "reports": reports })))
}

pub async fn resolve_scam_report(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ResolveReportRequest>,
) -> ApiResult {
    ctx.reports.resolve(&actor, id, req.outcome).await?;
    Ok(ok(json!({})))
}

/// Mark a user's email channel verified after out-of-band confirmation.
/// The mail transport that proves ownership lives outside this service.
pub async fn confirm_email(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult {
    require_admin(&actor)?;
    ctx.auth.confirm_email(id).await?;
    Ok(ok(json!({})))
}

/// Mark a user's phone channel verified after out-of-band confirmation.
pub async fn confirm_phone(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult {
    require_admin(&actor)?;
    ctx.auth.confirm_phone(id).await?;
    Ok(ok(json!({})))
}

fn require_admin(actor: &byaboneka_service::Actor) -> Result<(), crate::error::ApiError> {
    if actor.user.role != byaboneka_core::types::Role::Admin {
        return Err(byaboneka_core::error::DomainError::forbidden(
            "Administrator role required",
        )
        .into());
    }
    Ok(())
}

pub async fn recompute_trust(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult {
    require_admin(&actor)?;
    let report = ctx.trust.recompute(actor.id(), id).await?;
    Ok(ok(json!({ "report": report })))
}

pub async fn recent_audit(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Query(query): Query<LimitQuery>,
) -> ApiResult {
    let entries = ctx.reports.recent_audit(&actor, query.limit).await?;
    Ok(ok(json!({ "audit": entries })))
}

pub async fn entity_audit(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Path((entity, id)): Path<(String, Uuid)>,
    Query(query): Query<LimitQuery>,
) -> ApiResult {
    let entries = ctx
        .reports
        .audit_for(&actor, &entity, id, query.limit)
        .await?;
    Ok(ok(json!({ "audit": entries })))
}
