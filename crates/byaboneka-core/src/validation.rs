// # Input Validation Helpers
//
// Pure, policy-neutral field validators used by the service layer before any
// state is touched. All enforcement, rate limiting and fraud decisions are
// handled elsewhere; this file contains **only** structural validation.
//
// Validation functions return a simple `Result<(), String>` for ease of
// embedding directly into request constructors and handlers; the service
// layer folds failures into field-level `InvalidInput` errors.

/// Title length bounds for lost/found items.
pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 100;

/// Description length bounds.
pub const DESCRIPTION_MIN: usize = 10;
pub const DESCRIPTION_MAX: usize = 2000;

/// Exactly this many verification questions per lost item.
pub const SECRET_QUESTION_COUNT: usize = 3;

/// Image URL cap on found items.
pub const MAX_IMAGE_URLS: usize = 5;

/// Validate that a string field is non-empty after trimming.
pub fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required and must not be empty", field_name));
    }
    Ok(())
}

/// Validate a length range over characters, not bytes.
pub fn validate_length(
    value: &str,
    min: usize,
    max: usize,
    field_name: &str,
) -> Result<(), String> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(format!(
            "{} must be between {} and {} characters",
            field_name, min, max
        ));
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), String> {
    validate_length(title.trim(), TITLE_MIN, TITLE_MAX, "title")
}

pub fn validate_description(description: &str) -> Result<(), String> {
    validate_length(
        description.trim(),
        DESCRIPTION_MIN,
        DESCRIPTION_MAX,
        "description",
    )
}

/// Minimal email shape check: one `@`, non-empty local and domain parts,
/// a dot in the domain. Deliverability is the mail transport's problem.
pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    validate_non_empty(email, "email")?;

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(format!("email is not a valid address: {}", email));
    }
    if !parts[1].contains('.') || parts[1].starts_with('.') || parts[1].ends_with('.') {
        return Err(format!("email domain is not valid: {}", email));
    }
    Ok(())
}

/// Phone numbers: optional leading `+`, then 9-15 digits.
pub fn validate_phone(phone: &str) -> Result<(), String> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("phone must contain only digits: {}", phone));
    }
    if digits.len() < 9 || digits.len() > 15 {
        return Err(format!("phone must be 9-15 digits: {}", phone));
    }
    Ok(())
}

/// Passwords: at least 8 characters, at least one letter and one digit.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < 8 {
        return Err("password must be at least 8 characters".to_string());
    }
    if !password.chars().any(|c| c.is_alphabetic())
        || !password.chars().any(|c| c.is_ascii_digit())
    {
        return Err("password must contain at least one letter and one digit".to_string());
    }
    Ok(())
}

/// A handover code is exactly 6 decimal digits.
pub fn validate_otp_shape(otp: &str) -> Result<(), String> {
    if otp.len() != 6 || !otp.chars().all(|c| c.is_ascii_digit()) {
        return Err("code must be exactly 6 digits".to_string());
    }
    Ok(())
}

/// Lost items carry exactly three question/answer pairs, none blank.
pub fn validate_question_set(pairs: &[(String, String)]) -> Result<(), String> {
    if pairs.len() != SECRET_QUESTION_COUNT {
        return Err(format!(
            "exactly {} verification questions are required",
            SECRET_QUESTION_COUNT
        ));
    }
    for (i, (question, answer)) in pairs.iter().enumerate() {
        validate_non_empty(question, &format!("question {}", i + 1))?;
        validate_non_empty(answer, &format!("answer {}", i + 1))?;
    }
    Ok(())
}

pub fn validate_image_urls(urls: &[String]) -> Result<(), String> {
    if urls.len() > MAX_IMAGE_URLS {
        return Err(format!("at most {} images are allowed", MAX_IMAGE_URLS));
    }
    for url in urls {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(format!("image URL must be http(s): {}", url));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_non_empty() {
        assert!(validate_non_empty("ok", "x").is_ok());
        assert!(validate_non_empty("   ", "x").is_err());
    }

    #[test]
    fn test_validate_title_bounds() {
        assert!(validate_title("abc").is_ok());
        assert!(validate_title("ab").is_err());
        assert!(validate_title(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_description_bounds() {
        assert!(validate_description("a black phone case").is_ok());
        assert!(validate_description("too short").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.rw").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("user@nodot").is_err());
        assert!(validate_email("@example.rw").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+250788123456").is_ok());
        assert!(validate_phone("0788123456").is_ok());
        assert!(validate_phone("123").is_err());
        assert!(validate_phone("+250-788").is_err());
    }

    #[test]
    fn test_validate_otp_shape() {
        assert!(validate_otp_shape("012345").is_ok());
        assert!(validate_otp_shape("12345").is_err());
        assert!(validate_otp_shape("12345a").is_err());
    }

    #[test]
    fn test_validate_question_set() {
        let three = vec![
            ("q1".to_string(), "a1".to_string()),
            ("q2".to_string(), "a2".to_string()),
            ("q3".to_string(), "a3".to_string()),
        ];
        assert!(validate_question_set(&three).is_ok());
        assert!(validate_question_set(&three[..2].to_vec()).is_err());

        let blank = vec![
            ("q1".to_string(), "".to_string()),
            ("q2".to_string(), "a2".to_string()),
            ("q3".to_string(), "a3".to_string()),
        ];
        assert!(validate_question_set(&blank).is_err());
    }

    #[test]
    fn test_validate_image_urls() {
        let ok: Vec<String> = (0..5).map(|i| format!("https://img.rw/{}", i)).collect();
        assert!(validate_image_urls(&ok).is_ok());

        let too_many: Vec<String> = (0..6).map(|i| format!("https://img.rw/{}", i)).collect();
        assert!(validate_image_urls(&too_many).is_err());

        assert!(validate_image_urls(&["ftp://img.rw/x".to_string()]).is_err());
    }
}
