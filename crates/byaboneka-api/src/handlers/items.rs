//! /lost-items and /found-items endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use byaboneka_service::items::{ReportFoundRequest, ReportLostRequest};

use crate::error::{ok, ApiResult};
use crate::extract::AuthUser;
use crate::ApiContext;

#[derive(Deserialize)]
pub struct UpdateLostRequest {
    pub title: String,
    pub description: String,
}

pub async fn create_lost(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Json(req): Json<ReportLostRequest>,
) -> ApiResult {
    let item = ctx.items.report_lost(&actor, req).await?;
    Ok(ok(json!({ "lost_item": item })))
}

pub async fn list_lost(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
) -> ApiResult {
    let items = ctx.items.list_lost(&actor).await?;
    Ok(ok(json!({ "lost_items": items })))
}

pub async fn get_lost(
    State(ctx): State<ApiContext>,
    AuthUser(_actor): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult {
    let item = ctx.items.get_lost(id).await?;
    Ok(ok(json!({ "lost_item": item })))
}

pub async fn update_lost(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateLostRequest>,
) -> ApiResult {
    let item = ctx
        .items
        .update_lost_text(&actor, id, &req.title, &req.description)
        .await?;
    Ok(ok(json!({ "lost_item": item })))
}

pub async fn lost_matches(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult {
    let matches = ctx.matching.matches_for_lost(&actor, id).await?;
    Ok(ok(json!({ "matches": matches })))
}

pub async fn create_found(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Json(req): Json<ReportFoundRequest>,
) -> ApiResult {
    let item = ctx.items.report_found(&actor, req).await?;
    Ok(ok(json!({ "found_item": item })))
}

pub async fn list_found(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
) -> ApiResult {
    let items = ctx.items.list_found(&actor).await?;
    Ok(ok(json!({ "found_items": items })))
}

pub async fn get_found(
    State(ctx): State<ApiContext>,
    AuthUser(_actor): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult {
    let item = ctx.items.get_found(id).await?;
    Ok(ok(json!({ "found_item": item })))
}

pub async fn found_matches(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult {
    let matches = ctx.matching.matches_for_found(&actor, id).await?;
    Ok(ok(json!({ "matches": matches })))
}
