//! Request extractors.
//!
//! `AuthUser` turns `Authorization: Bearer <access>` into a service-layer
//! [`Actor`]: token validated, user loaded live (a mid-session ban bites on
//! the next request), client IP captured for the fraud layer. Identity is
//! explicit from here on; nothing downstream reads headers.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use byaboneka_core::error::DomainError;
use byaboneka_service::Actor;

use crate::error::ApiError;
use crate::ApiContext;

pub struct AuthUser(pub Actor);

#[async_trait]
impl FromRequestParts<ApiContext> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiContext,
    ) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError(DomainError::Unauthenticated))?;

        let user = state.auth.authenticate(bearer).await?;
        Ok(AuthUser(Actor::new(user, client_ip(parts))))
    }
}

/// First hop of X-Forwarded-For when present; the socket address is the
/// node's concern and arrives via the same header behind the proxy.
pub fn client_ip(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
