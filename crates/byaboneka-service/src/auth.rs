//! Authentication & token lifecycle.
//!
//! Passwords are argon2 PHC hashes. Sessions are a signed token pair:
//! a short-lived access token and a 7-day refresh token whose salted digest
//! is stored server-side so it can be revoked. Rotation on refresh is
//! mandatory; presenting a revoked refresh token revokes the whole family,
//! since that only happens when a token leaked.

use argon2::password_hash::{rand_core::OsRng as SaltRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

use byaboneka_core::error::{DomainError, FieldError};
use byaboneka_core::trust::TrustReason;
use byaboneka_core::types::{
    ActionKind, RefreshTokenRow, ResetTokenRow, Role, User,
};
use byaboneka_core::validation;

use crate::notify::Notifier;
use crate::trust::TrustService;
use crate::{audit, store_err, Actor, DynStore};

pub const ACCESS_TTL_MINUTES: i64 = 15;
pub const REFRESH_TTL_DAYS: i64 = 7;
pub const RESET_TTL_HOURS: i64 = 1;

/// Message shown to banned accounts everywhere.
pub const SUSPENDED_MESSAGE: &str = "Account has been suspended";

#[derive(Clone)]
pub struct AuthConfig {
    pub access_secret: Vec<u8>,
    pub refresh_secret: Vec<u8>,
}

#[derive(Clone)]
pub struct AuthService {
    store: DynStore,
    config: Arc<AuthConfig>,
    trust: TrustService,
    notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until the access token expires.
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String,
    role: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct RefreshClaims {
    sub: String,
    jti: String,
    iat: i64,
    exp: i64,
}

// ============================================================================
// Password & digest helpers
// ============================================================================

fn hash_password(password: &str) -> Result<String, DomainError> {
    let salt = SaltString::generate(&mut SaltRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| DomainError::Internal(anyhow::anyhow!("password hash failed: {e}")))
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

fn salted_digest(salt: &str, token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn plain_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

// ============================================================================
// Service
// ============================================================================

impl AuthService {
    pub fn new(
        store: DynStore,
        config: AuthConfig,
        trust: TrustService,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            config: Arc::new(config),
            trust,
            notifier,
        }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<User, DomainError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, result: Result<(), String>| {
            if let Err(message) = result {
                errors.push(FieldError {
                    field: field.to_string(),
                    message,
                });
            }
        };
        push("email", validation::validate_email(&req.email));
        push("password", validation::validate_password(&req.password));
        push(
            "display_name",
            validation::validate_non_empty(&req.display_name, "display_name"),
        );
        if let Some(phone) = &req.phone {
            push("phone", validation::validate_phone(phone));
        }
        if !errors.is_empty() {
            return Err(DomainError::invalid_fields("Validation failed", errors));
        }

        let email = req.email.trim().to_lowercase();
        if self
            .store
            .identity_taken(&email, req.phone.as_deref())
            .await
            .map_err(store_err)?
        {
            return Err(DomainError::conflict(
                "An account with this email or phone already exists",
            ));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            phone: req.phone,
            display_name: req.display_name.trim().to_string(),
            password_hash: hash_password(&req.password)?,
            role: Role::Citizen,
            trust_score: 0,
            email_verified: false,
            phone_verified: false,
            is_banned: false,
            ban_reason: None,
            cooperative_id: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_user(&user).await.map_err(store_err)?;

        audit(
            &self.store,
            Some(user.id),
            "user_registered",
            "user",
            Some(user.id),
            serde_json::json!({}),
        )
        .await;

        Ok(user)
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        ip: Option<String>,
    ) -> Result<(User, TokenPair), DomainError> {
        let user = self
            .store
            .user_by_email(&email.trim().to_lowercase())
            .await
            .map_err(store_err)?;

        // Hash comparison runs even for unknown accounts so the two cases
        // are not distinguishable by timing.
        let user = match user {
            Some(user) if verify_password(password, &user.password_hash) => user,
            _ => {
                let _ = verify_password(password, DUMMY_HASH);
                return Err(DomainError::Unauthenticated);
            }
        };

        if user.is_banned {
            return Err(DomainError::forbidden(SUSPENDED_MESSAGE));
        }

        let pair = self.issue_pair(&user).await?;

        let actor = Actor::new(user.clone(), ip);
        let fraud = crate::fraud::FraudGate::new(self.store.clone());
        fraud.record(&actor, ActionKind::Login).await?;

        Ok((user, pair))
    }

    /// Validate an access token and load its live user. Rejects banned
    /// accounts so a mid-session ban takes effect on the next request.
    pub async fn authenticate(&self, bearer: &str) -> Result<User, DomainError> {
        let claims = decode::<AccessClaims>(
            bearer,
            &DecodingKey::from_secret(&self.config.access_secret),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| DomainError::Unauthenticated)?
        .claims;

        let user_id: Uuid = claims
            .sub
            .parse()
            .map_err(|_| DomainError::Unauthenticated)?;
        let user = self
            .store
            .user_by_id(user_id)
            .await
            .map_err(store_err)?
            .ok_or(DomainError::Unauthenticated)?;

        if user.is_banned {
            return Err(DomainError::forbidden(SUSPENDED_MESSAGE));
        }
        Ok(user)
    }

    /// Rotate a refresh token: the presented token is invalidated and a
    /// fresh pair is issued. A token that was already rotated or revoked
    /// burns the whole family.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, DomainError> {
        let claims = decode::<RefreshClaims>(
            refresh_token,
            &DecodingKey::from_secret(&self.config.refresh_secret),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| DomainError::Unauthenticated)?
        .claims;

        let jti: Uuid = claims
            .jti
            .parse()
            .map_err(|_| DomainError::Unauthenticated)?;
        let row = self
            .store
            .refresh_by_id(jti)
            .await
            .map_err(store_err)?
            .ok_or(DomainError::Unauthenticated)?;

        if row.token_hash != salted_digest(&row.salt, refresh_token) {
            return Err(DomainError::Unauthenticated);
        }
        if row.revoked_at.is_some() {
            // Reuse of a rotated token: assume leakage, burn everything.
            tracing::warn!(user = %row.user_id, "revoked refresh token replayed");
            self.store
                .revoke_all_refresh(row.user_id)
                .await
                .map_err(store_err)?;
            return Err(DomainError::Unauthenticated);
        }
        if row.expires_at <= Utc::now() {
            return Err(DomainError::Unauthenticated);
        }

        let user = self
            .store
            .user_by_id(row.user_id)
            .await
            .map_err(store_err)?
            .ok_or(DomainError::Unauthenticated)?;
        if user.is_banned {
            return Err(DomainError::forbidden(SUSPENDED_MESSAGE));
        }

        self.store.revoke_refresh(jti).await.map_err(store_err)?;
        self.issue_pair(&user).await
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<(), DomainError> {
        if let Ok(data) = decode::<RefreshClaims>(
            refresh_token,
            &DecodingKey::from_secret(&self.config.refresh_secret),
            &Validation::new(Algorithm::HS256),
        ) {
            if let Ok(jti) = data.claims.jti.parse::<Uuid>() {
                self.store.revoke_refresh(jti).await.map_err(store_err)?;
            }
        }
        // Logout with a garbage token is still a logout.
        Ok(())
    }

    /// Start a password reset. Always succeeds from the caller's view so the
    /// endpoint cannot be used to probe which emails exist.
    pub async fn forgot_password(&self, email: &str) -> Result<(), DomainError> {
        let user = match self
            .store
            .user_by_email(&email.trim().to_lowercase())
            .await
            .map_err(store_err)?
        {
            Some(user) => user,
            None => return Ok(()),
        };

        let token = random_hex(32);
        let row = ResetTokenRow {
            id: Uuid::new_v4(),
            user_id: user.id,
            token_hash: plain_digest(&token),
            expires_at: Utc::now() + Duration::hours(RESET_TTL_HOURS),
            used_at: None,
            created_at: Utc::now(),
        };
        self.store.insert_reset(&row).await.map_err(store_err)?;
        self.notifier.password_reset(&user, &token).await;
        Ok(())
    }

    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), DomainError> {
        validation::validate_password(new_password).map_err(DomainError::invalid)?;

        let row = self
            .store
            .consume_reset(&plain_digest(token), Utc::now())
            .await
            .map_err(store_err)?
            .ok_or_else(|| DomainError::Expired("Reset link is invalid or expired".into()))?;

        let hash = hash_password(new_password)?;
        self.store
            .set_password_hash(row.user_id, &hash)
            .await
            .map_err(store_err)?;
        // Every standing session dies with the old password.
        self.store
            .revoke_all_refresh(row.user_id)
            .await
            .map_err(store_err)?;

        audit(
            &self.store,
            Some(row.user_id),
            "password_reset",
            "user",
            Some(row.user_id),
            serde_json::json!({}),
        )
        .await;
        Ok(())
    }

    /// Mark the email channel verified, crediting trust once.
    pub async fn confirm_email(&self, user_id: Uuid) -> Result<(), DomainError> {
        let user = self
            .store
            .user_by_id(user_id)
            .await
            .map_err(store_err)?
            .ok_or(DomainError::NotFound("user"))?;
        if user.email_verified {
            return Ok(());
        }
        self.store
            .set_email_verified(user_id)
            .await
            .map_err(store_err)?;
        self.trust.apply(user_id, TrustReason::EmailVerified).await?;
        Ok(())
    }

    /// Mark the phone channel verified, crediting trust once.
    pub async fn confirm_phone(&self, user_id: Uuid) -> Result<(), DomainError> {
        let user = self
            .store
            .user_by_id(user_id)
            .await
            .map_err(store_err)?
            .ok_or(DomainError::NotFound("user"))?;
        if user.phone_verified {
            return Ok(());
        }
        self.store
            .set_phone_verified(user_id)
            .await
            .map_err(store_err)?;
        self.trust.apply(user_id, TrustReason::PhoneVerified).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Token minting
    // ------------------------------------------------------------------

    async fn issue_pair(&self, user: &User) -> Result<TokenPair, DomainError> {
        let now = Utc::now();
        let access_exp = now + Duration::minutes(ACCESS_TTL_MINUTES);
        let refresh_exp = now + Duration::days(REFRESH_TTL_DAYS);
        let jti = Uuid::new_v4();

        let access = encode(
            &Header::default(),
            &AccessClaims {
                sub: user.id.to_string(),
                role: user.role.to_string(),
                iat: now.timestamp(),
                exp: access_exp.timestamp(),
            },
            &EncodingKey::from_secret(&self.config.access_secret),
        )
        .map_err(|e| DomainError::Internal(anyhow::anyhow!("access token encode: {e}")))?;

        let refresh = encode(
            &Header::default(),
            &RefreshClaims {
                sub: user.id.to_string(),
                jti: jti.to_string(),
                iat: now.timestamp(),
                exp: refresh_exp.timestamp(),
            },
            &EncodingKey::from_secret(&self.config.refresh_secret),
        )
        .map_err(|e| DomainError::Internal(anyhow::anyhow!("refresh token encode: {e}")))?;

        let salt = random_hex(16);
        let row = RefreshTokenRow {
            id: jti,
            user_id: user.id,
            token_hash: salted_digest(&salt, &refresh),
            salt,
            expires_at: refresh_exp,
            revoked_at: None,
            created_at: now,
        };
        self.store.insert_refresh(&row).await.map_err(store_err)?;

        Ok(TokenPair {
            access_token: access,
            refresh_token: refresh,
            expires_in: ACCESS_TTL_MINUTES * 60,
        })
    }
}

/// A well-formed argon2 hash used to equalize timing on unknown accounts.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$YWJjZGVmZ2hpamtsbW5vcA$W5cntcXl+Jyhf3Gvp5generated";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salted_digest_is_stable_and_salted() {
        let a = salted_digest("salt1", "token");
        assert_eq!(a, salted_digest("salt1", "token"));
        assert_ne!(a, salted_digest("salt2", "token"));
        assert_ne!(a, salted_digest("salt1", "other"));
    }

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("correct horse 1").unwrap();
        assert!(verify_password("correct horse 1", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn test_random_hex_length_and_uniqueness() {
        let a = random_hex(16);
        let b = random_hex(16);
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
