//! /claims/:id/handover endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::{ok, ApiResult};
use crate::extract::AuthUser;
use crate::ApiContext;

#[derive(Deserialize)]
pub struct RedeemRequest {
    pub otp: String,
}

/// Mint a handover code. Owner only; the plaintext appears in this response
/// and nowhere else, ever.
pub async fn mint(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult {
    let minted = ctx.handover.mint(&actor, id).await?;
    Ok(ok(json!({
        "otp": minted.otp,
        "expires_at": minted.expires_at,
    })))
}

pub async fn redeem(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<RedeemRequest>,
) -> ApiResult {
    let claim = ctx.handover.redeem(&actor, id, &req.otp).await?;
    Ok(ok(json!({ "claim": claim })))
}

pub async fn status(
    State(ctx): State<ApiContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult {
    let status = ctx.handover.status(&actor, id).await?;
    Ok(ok(json!({ "handover": status })))
}
