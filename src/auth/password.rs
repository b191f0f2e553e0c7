/// Password Hashing and Verification
///
/// Handles password hashing with Argon2id and password strength validation.
/// The PHC hash string encodes parameters and salt, so verification keeps
/// working after parameter changes.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::error::{AppError, ValidationError};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

// Argon2id cost parameters: 64 MiB memory, 3 passes, 1 lane
const MEMORY_COST_KIB: u32 = 64 * 1024;
const TIME_COST: u32 = 3;
const PARALLELISM: u32 = 1;

fn hasher() -> Argon2<'static> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, None)
        .expect("static Argon2 parameters are valid");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Hash a password using Argon2id with a random per-call salt
///
/// # Errors
/// Returns error if:
/// - Password fails strength validation (too short, weak, etc.)
/// - Hashing itself fails (fatal for the calling operation)
pub fn hash_password(password: &str) -> Result<String, AppError> {
    validate_password_strength(password)?;

    let salt = SaltString::generate(&mut OsRng);
    hasher()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
///
/// Never errors on malformed input: a corrupt or unparseable hash verifies
/// as `false`.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };

    hasher()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Validate password strength requirements
///
/// Requirements:
/// - Minimum 8 characters
/// - Maximum 128 characters
/// - At least one digit
/// - At least one lowercase letter
/// - At least one uppercase letter
pub fn validate_password_strength(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        )));
    }

    // DoS prevention: hashing cost grows with input length
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        )));
    }

    let has_digit = password.chars().any(|c| c.is_numeric());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(AppError::Validation(ValidationError::InvalidFormat(
            "password must contain at least one digit, one lowercase letter, and one uppercase letter"
                .to_string(),
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let password = "ValidPassword123";
        let hash = hash_password(password).expect("Failed to hash password");

        // Hash should not be the same as password
        assert_ne!(password, hash);
        // PHC string encodes the algorithm
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_verify_password() {
        let password = "ValidPassword123";
        let hash = hash_password(password).expect("Failed to hash password");

        assert!(verify_password(password, &hash));
    }

    #[test]
    fn test_verify_wrong_password() {
        let password = "ValidPassword123";
        let hash = hash_password(password).expect("Failed to hash password");

        assert!(!verify_password("WrongPassword123", &hash));
    }

    #[test]
    fn test_malformed_hash_verifies_false() {
        assert!(!verify_password("ValidPassword123", ""));
        assert!(!verify_password("ValidPassword123", "not-a-phc-string"));
        assert!(!verify_password("ValidPassword123", "$argon2id$corrupt"));
    }

    #[test]
    fn test_too_short_password() {
        let result = hash_password("Short1");
        assert!(result.is_err());
    }

    #[test]
    fn test_too_long_password() {
        let long_password = "a".repeat(MAX_PASSWORD_LENGTH + 1) + "A1";
        let result = hash_password(&long_password);
        assert!(result.is_err());
    }

    #[test]
    fn test_no_digits() {
        let result = hash_password("NoDigitsPassword");
        assert!(result.is_err());
    }

    #[test]
    fn test_no_lowercase() {
        let result = hash_password("NOLOWERCASE1");
        assert!(result.is_err());
    }

    #[test]
    fn test_no_uppercase() {
        let result = hash_password("nouppercase1");
        assert!(result.is_err());
    }
}
