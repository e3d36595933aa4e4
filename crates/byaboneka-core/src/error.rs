//! Typed domain errors shared by every subsystem.
//!
//! Guard failures inside the claim state machine are recovered locally and
//! surfaced as one of these variants; no partial state is ever committed on
//! the error path. The API layer owns the mapping to HTTP statuses.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::fraud::RiskLevel;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Request payload failed validation. Field-level details attached.
    #[error("{message}")]
    InvalidInput {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("Authentication required")]
    Unauthenticated,

    /// Role or ownership violation.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Duplicate resource or state precondition violation.
    #[error("{0}")]
    Conflict(String),

    /// Tier cap or sliding-window limit exceeded.
    #[error("{message}")]
    RateLimited {
        message: String,
        retry_after_secs: Option<u64>,
    },

    /// Per-claim temporal guard: no attempts until the deadline.
    #[error("Too many failed attempts, try again later")]
    Cooldown { until: DateTime<Utc> },

    /// Rejected by the fraud scorer before any side effect.
    #[error("Request blocked for security review")]
    Blocked { level: RiskLevel },

    /// OTP or claim past its deadline.
    #[error("{0}")]
    Expired(String),

    /// Connection or transaction failure; surfaced without detail.
    #[error("Storage unavailable")]
    TransientStore(#[source] anyhow::Error),

    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

/// One field-level validation failure.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl DomainError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn invalid_fields(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            errors,
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Wrap a storage failure. Callers decide nothing here: the transaction
    /// has already rolled back by the time this is constructed.
    pub fn store(err: anyhow::Error) -> Self {
        Self::TransientStore(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_no_detail_for_store_errors() {
        let err = DomainError::store(anyhow::anyhow!("connection refused to 10.0.0.5"));
        assert_eq!(err.to_string(), "Storage unavailable");
    }

    #[test]
    fn test_invalid_input_message() {
        let err = DomainError::invalid("title must be 3-100 characters");
        assert_eq!(err.to_string(), "title must be 3-100 characters");
    }
}
