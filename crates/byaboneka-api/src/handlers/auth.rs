//! /auth endpoints.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use byaboneka_service::auth::RegisterRequest;

use crate::error::{ok, ApiResult};
use crate::ApiContext;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

fn header_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub async fn register(
    State(ctx): State<ApiContext>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult {
    let user = ctx.auth.register(req).await?;
    Ok(ok(json!({ "user": user })))
}

pub async fn login(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> ApiResult {
    let ip = header_ip(&headers);
    let (user, tokens) = ctx.auth.login(&req.email, &req.password, ip).await?;
    Ok(ok(json!({ "user": user, "tokens": tokens })))
}

pub async fn refresh(
    State(ctx): State<ApiContext>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult {
    let tokens = ctx.auth.refresh(&req.refresh_token).await?;
    Ok(ok(json!({ "tokens": tokens })))
}

pub async fn logout(
    State(ctx): State<ApiContext>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult {
    ctx.auth.logout(&req.refresh_token).await?;
    Ok(ok(json!({})))
}

pub async fn forgot_password(
    State(ctx): State<ApiContext>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult {
    ctx.auth.forgot_password(&req.email).await?;
    // Identical response whether or not the account exists.
    Ok(ok(json!({
        "message": "If that address is registered, a reset link is on its way"
    })))
}

pub async fn reset_password(
    State(ctx): State<ApiContext>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult {
    ctx.auth.reset_password(&req.token, &req.new_password).await?;
    Ok(ok(json!({})))
}
