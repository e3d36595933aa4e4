//! Error envelope.
//!
//! Every failure leaves the API as `{"success": false, "message": …}` with
//! optional field-level details, mapped onto the conventional statuses:
//! 400 validation, 401 token, 403 role/ownership/block, 404 resource,
//! 409 conflict, 410 expired, 429 limits and cooldowns, 500 the rest.
//! Store and internal errors carry no detail across the wire.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use byaboneka_core::error::{DomainError, FieldError};

pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError(err)
    }
}

#[derive(Serialize)]
struct Envelope {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    risk_level: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut envelope = Envelope {
            success: false,
            message: self.0.to_string(),
            errors: None,
            retry_after_secs: None,
            risk_level: None,
        };

        let status = match self.0 {
            DomainError::InvalidInput { errors, .. } => {
                if !errors.is_empty() {
                    envelope.errors = Some(errors);
                }
                StatusCode::BAD_REQUEST
            }
            DomainError::Unauthenticated => StatusCode::UNAUTHORIZED,
            DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::RateLimited {
                retry_after_secs, ..
            } => {
                envelope.retry_after_secs = retry_after_secs;
                StatusCode::TOO_MANY_REQUESTS
            }
            DomainError::Cooldown { until } => {
                let now = chrono::Utc::now();
                if until > now {
                    envelope.retry_after_secs = Some((until - now).num_seconds().max(0) as u64);
                }
                StatusCode::TOO_MANY_REQUESTS
            }
            DomainError::Blocked { level } => {
                // The level travels; the factor list stays server-side.
                envelope.risk_level =
                    Some(serde_json::to_value(level).map_or_else(
                        |_| "unknown".to_string(),
                        |v| v.as_str().unwrap_or("unknown").to_string(),
                    ));
                StatusCode::FORBIDDEN
            }
            DomainError::Expired(_) => StatusCode::GONE,
            DomainError::TransientStore(ref err) => {
                tracing::error!(error = %err, "storage failure surfaced as 500");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            DomainError::Internal(ref err) => {
                tracing::error!(error = %err, "internal failure surfaced as 500");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(envelope)).into_response()
    }
}

/// Success envelope helper.
pub fn ok<T: Serialize>(data: T) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "data": data }))
}

pub type ApiResult = Result<Json<serde_json::Value>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use byaboneka_core::fraud::RiskLevel;

    fn status_of(err: DomainError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_of(DomainError::invalid("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(DomainError::Unauthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(DomainError::forbidden("x")),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(DomainError::NotFound("claim")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(DomainError::conflict("x")), StatusCode::CONFLICT);
        assert_eq!(
            status_of(DomainError::RateLimited {
                message: "x".into(),
                retry_after_secs: None
            }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_of(DomainError::Cooldown {
                until: chrono::Utc::now()
            }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_of(DomainError::Blocked {
                level: RiskLevel::Critical
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(DomainError::Expired("x".into())),
            StatusCode::GONE
        );
        assert_eq!(
            status_of(DomainError::store(anyhow::anyhow!("pool gone"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
