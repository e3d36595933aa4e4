//! Secret-answer normalization and hashing.
//!
//! Every lost item carries exactly three (question, answer) pairs. Answers
//! are normalized, then hashed with a per-answer 16-byte salt under the
//! adaptive-cost primitive. Plaintext answers and salts never leave this
//! layer; verification returns only a per-question correctness bit.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use uuid::Uuid;

use crate::error::DomainError;
use crate::types::SecretQuestion;
use crate::validation::SECRET_QUESTION_COUNT;

/// Normalize a submitted answer before hashing or comparison:
/// lowercase → trim → punctuation to spaces → collapse whitespace.
///
/// "Mountains", " mountains ", "MOUNTAINS!" all normalize identically.
pub fn normalize_answer(answer: &str) -> String {
    let lowered = answer.to_lowercase();
    let spaced: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Hash a normalized answer with a fresh 16-byte salt.
/// Returns (salt_b64, phc_hash).
pub fn hash_answer(answer: &str) -> Result<(String, String), DomainError> {
    let normalized = normalize_answer(answer);
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(normalized.as_bytes(), &salt)
        .map_err(|e| DomainError::Internal(anyhow::anyhow!("answer hash failed: {e}")))?;
    Ok((salt.as_str().to_string(), hash.to_string()))
}

/// Constant-time-by-primitive comparison of a submitted answer against a
/// stored hash. Errors in hash parsing count as a mismatch rather than a
/// surfaced failure so a corrupt row cannot be distinguished from a wrong
/// answer by the caller.
pub fn verify_answer(submitted: &str, stored_hash: &str) -> bool {
    let normalized = normalize_answer(submitted);
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(normalized.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Build the three stored secret rows for a lost item.
pub fn build_secret_set(
    lost_item_id: Uuid,
    pairs: &[(String, String)],
) -> Result<Vec<SecretQuestion>, DomainError> {
    if pairs.len() != SECRET_QUESTION_COUNT {
        return Err(DomainError::invalid(format!(
            "exactly {} verification questions are required",
            SECRET_QUESTION_COUNT
        )));
    }

    let mut rows = Vec::with_capacity(SECRET_QUESTION_COUNT);
    for (position, (question, answer)) in pairs.iter().enumerate() {
        let (salt, answer_hash) = hash_answer(answer)?;
        rows.push(SecretQuestion {
            id: Uuid::new_v4(),
            lost_item_id,
            position: position as i16,
            question: question.clone(),
            salt,
            answer_hash,
        });
    }
    Ok(rows)
}

/// Evaluate submitted answers against stored rows, by position.
/// Returns one correctness bit per question.
pub fn verify_answers(
    stored: &[SecretQuestion],
    submitted: &[String],
) -> [bool; SECRET_QUESTION_COUNT] {
    let mut bits = [false; SECRET_QUESTION_COUNT];
    for row in stored {
        let idx = row.position as usize;
        if idx < SECRET_QUESTION_COUNT {
            if let Some(answer) = submitted.get(idx) {
                bits[idx] = verify_answer(answer, &row.answer_hash);
            }
        }
    }
    bits
}
