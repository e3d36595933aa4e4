//! Handover OTP primitives.
//!
//! A handover code is 6 decimal digits from the OS cryptographic RNG, stored
//! only as a salted adaptive-cost hash. Expiry and attempt limits are
//! enforced by the handover service; this module mints and checks codes.

use argon2::password_hash::{rand_core::OsRng as SaltRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::Duration;
use rand::rngs::OsRng;
use rand::Rng;

use crate::error::DomainError;

/// OTP validity window.
pub const OTP_TTL_HOURS: i64 = 24;

/// Redemption attempts before the confirmation locks.
pub const OTP_MAX_ATTEMPTS: i32 = 3;

pub fn otp_ttl() -> Duration {
    Duration::hours(OTP_TTL_HOURS)
}

/// Mint a fresh 6-digit code. Leading zeros are significant: the code is a
/// string, never an integer.
pub fn generate_code() -> String {
    let n: u32 = OsRng.gen_range(0..1_000_000);
    format!("{:06}", n)
}

/// Hash a code for storage.
pub fn hash_code(code: &str) -> Result<String, DomainError> {
    let salt = SaltString::generate(&mut SaltRng);
    let hash = Argon2::default()
        .hash_password(code.as_bytes(), &salt)
        .map_err(|e| DomainError::Internal(anyhow::anyhow!("otp hash failed: {e}")))?;
    Ok(hash.to_string())
}

/// Check a submitted code against the stored hash.
pub fn verify_code(submitted: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(submitted.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_shape() {
        for _ in 0..32 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_hash_round_trip() {
        let code = generate_code();
        let hash = hash_code(&code).unwrap();
        assert!(verify_code(&code, &hash));
        assert!(!verify_code("999999", &hash) || code == "999999");
    }

    #[test]
    fn test_leading_zeros_preserved() {
        let hash = hash_code("000042").unwrap();
        assert!(verify_code("000042", &hash));
        assert!(!verify_code("42", &hash));
    }

    #[test]
    fn test_plaintext_not_in_hash() {
        let hash = hash_code("123456").unwrap();
        assert!(!hash.contains("123456"));
    }
}
