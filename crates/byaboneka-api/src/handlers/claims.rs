//! /claims endpoints: open, questions, verify, cancel, dispute.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::{ok, ApiResult};
use crate::extract::AuthUser;
use crate::ApiContext;

#[derive(Deserialize)]
pub struct CreateClaimRequest {
    pub lost_item_id: Uuid,
    pub found_item_id: Uuid,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub answers: Vec<String>,
}

#[derive(Deserialize)]
pub struct DisputeRequest {
    pub reason: String,
}

pub async fn create(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Json(req): Json<CreateClaimRequest>,
) -> ApiResult {
    let claim = ctx
        .claims
        .open_claim(&actor, req.lost_item_id, req.found_item_id)
        .await?;
    Ok(ok(json!({ "claim": claim })))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult {
    let claim = ctx.claims.get_claim(&actor, id).await?;
    Ok(ok(json!({ "claim": claim })))
}

pub async fn questions(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult {
    let questions = ctx.claims.questions(&actor, id).await?;
    Ok(ok(json!({ "questions": questions })))
}

pub async fn verify(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<VerifyRequest>,
) -> ApiResult {
    let outcome = ctx.claims.verify(&actor, id, req.answers).await?;
    Ok(ok(json!({ "result": outcome })))
}

pub async fn cancel(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult {
    ctx.claims.cancel(&actor, id).await?;
    Ok(ok(json!({})))
}

pub async fn dispute(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<DisputeRequest>,
) -> ApiResult {
    let dispute = ctx.claims.open_dispute(&actor, id, req.reason).await?;
    Ok(ok(json!({ "dispute": dispute })))
}
