/// Input validators
///
/// Email validation and normalization. Email is the case-insensitive
/// compare key of the user store, so the validated value comes back
/// lowercased.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();
}

/// Validates and normalizes an email address
/// - Checks format using RFC 5322 simplified regex
/// - Verifies length constraints
/// - Returns the trimmed, lowercased form
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort(
            "email".to_string(),
            MIN_EMAIL_LENGTH,
        ));
    }

    // Length cap guards against extremely long hostile inputs
    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong(
            "email".to_string(),
            MAX_EMAIL_LENGTH,
        ));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    if has_suspicious_email_patterns(trimmed) {
        return Err(ValidationError::SuspiciousContent("email".to_string()));
    }

    Ok(trimmed.to_lowercase())
}

/// Detects patterns a well-formed address never carries
fn has_suspicious_email_patterns(email: &str) -> bool {
    // Extremely long local part (before @)
    if let Some(at_pos) = email.find('@') {
        let local_part = &email[..at_pos];
        if local_part.len() > 64 {
            return true;
        }
    }

    if email.matches('@').count() != 1 {
        return true;
    }

    if email.contains('\0') {
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(is_valid_email("user@example.com").is_ok());
        assert!(is_valid_email("test.email@domain.co.uk").is_ok());
        assert!(is_valid_email("user+tag@example.com").is_ok());
    }

    #[test]
    fn test_invalid_email_format() {
        assert!(is_valid_email("invalid").is_err());
        assert!(is_valid_email("user@").is_err());
        assert!(is_valid_email("@example.com").is_err());
        assert!(is_valid_email("user@@example.com").is_err());
    }

    #[test]
    fn test_email_length_limits() {
        let too_long = format!("{}@example.com", "a".repeat(250));
        assert!(is_valid_email(&too_long).is_err());

        assert!(is_valid_email("a@a.com").is_err()); // Too short
    }

    #[test]
    fn test_email_is_normalized() {
        assert_eq!(
            is_valid_email("  User@Example.COM  ").unwrap(),
            "user@example.com"
        );
    }

    #[test]
    fn test_oversized_local_part_rejected() {
        let email = format!("{}@example.com", "a".repeat(70));
        assert!(is_valid_email(&email).is_err());
    }
}
