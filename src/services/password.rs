//! Password hashing and strength rules
//!
//! Secure password hashing and verification using Argon2id, the
//! recommended variant for password hashing.
//!
//! # Security
//!
//! - Uses Argon2id variant (hybrid of Argon2i and Argon2d)
//! - Uses secure default parameters from the argon2 crate
//! - Generates random salt for each password hash

use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a password using Argon2id with secure defaults.
///
/// # Returns
///
/// The password hash as a PHC string (includes algorithm, parameters,
/// salt, and hash).
///
/// # Errors
///
/// Returns an error if password hashing fails
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
        .context("Password hashing failed")?;

    Ok(password_hash.to_string())
}

/// Verify a password against a stored hash.
///
/// # Returns
///
/// `true` if the password matches the hash, `false` otherwise
///
/// # Errors
///
/// Returns an error if the hash format is invalid
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))
        .context("Failed to parse password hash")?;

    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Password verification failed: {}", e))
            .context("Password verification error"),
    }
}

/// Check a candidate password against the strength rules.
///
/// Passwords must be at least eight characters and contain an uppercase
/// letter, a lowercase letter, and a digit.
///
/// # Returns
///
/// `Ok(())` if the password is acceptable, otherwise an error message
/// suitable for showing to the user.
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        ));
    }

    if !password.chars().any(|c| c.is_uppercase()) {
        return Err("Password must contain an uppercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_lowercase()) {
        return Err("Password must contain a lowercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain a digit".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_produces_argon2id_hash() {
        let password = "Test_password_123";
        let hash = hash_password(password).expect("Failed to hash password");

        assert!(hash.starts_with("$argon2id$"), "Hash should use Argon2id");
    }

    #[test]
    fn test_hash_password_produces_different_hashes() {
        let password = "Same_password1";
        let hash1 = hash_password(password).expect("Failed to hash password");
        let hash2 = hash_password(password).expect("Failed to hash password");

        // Different salts should produce different hashes
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password_correct() {
        let password = "Correct_password1";
        let hash = hash_password(password).expect("Failed to hash password");

        let result = verify_password(password, &hash).expect("Verification should not error");
        assert!(result);
    }

    #[test]
    fn test_verify_password_incorrect() {
        let hash = hash_password("Correct_password1").expect("Failed to hash password");

        let result =
            verify_password("Wrong_password1", &hash).expect("Verification should not error");
        assert!(!result);
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        let result = verify_password("password", "invalid_hash_format");
        assert!(result.is_err(), "Invalid hash format should return error");
    }

    #[test]
    fn test_hash_password_unicode() {
        let password = "Sécurité123🔐";
        let hash = hash_password(password).expect("Failed to hash unicode password");

        let result = verify_password(password, &hash).expect("Verification should not error");
        assert!(result);
    }

    #[test]
    fn test_password_hash_not_equal_to_password() {
        let password = "My_secret_password1";
        let hash = hash_password(password).expect("Failed to hash password");

        assert_ne!(password, hash);
        assert!(!hash.contains(password));
    }

    #[test]
    fn test_strength_accepts_valid_password() {
        assert!(validate_password_strength("Qwerty0000").is_ok());
    }

    #[test]
    fn test_strength_rejects_short_password() {
        assert!(validate_password_strength("Ab1").is_err());
    }

    #[test]
    fn test_strength_rejects_missing_uppercase() {
        assert!(validate_password_strength("qwerty0000").is_err());
    }

    #[test]
    fn test_strength_rejects_missing_lowercase() {
        assert!(validate_password_strength("QWERTY0000").is_err());
    }

    #[test]
    fn test_strength_rejects_missing_digit() {
        assert!(validate_password_strength("QwertyUiop").is_err());
    }

    #[test]
    fn test_strength_counts_chars_not_bytes() {
        // 8 multi-byte characters plus the required classes
        assert!(validate_password_strength("Aaé1é2é3").is_ok());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Any password should hash to an Argon2id PHC string that
        /// verifies only against the original password.
        #[test]
        fn property_password_hash_roundtrip(
            password in "[a-zA-Z0-9!@#$%^&*()_+-=]{1,50}"
        ) {
            let hash = hash_password(&password).expect("Password hashing should succeed");

            prop_assert_ne!(&hash, &password);
            prop_assert!(hash.starts_with("$argon2id$"));
            prop_assert!(hash.len() > 80);

            let verify_result =
                verify_password(&password, &hash).expect("Verification should not error");
            prop_assert!(verify_result);

            let wrong_password = format!("{}wrong", password);
            let wrong_verify_result =
                verify_password(&wrong_password, &hash).expect("Verification should not error");
            prop_assert!(!wrong_verify_result);
        }

        /// Passwords with all three character classes and enough length
        /// always pass the strength check.
        #[test]
        fn property_strength_accepts_complete_passwords(
            upper in "[A-Z]{2,10}",
            lower in "[a-z]{2,10}",
            digits in "[0-9]{2,10}",
        ) {
            let password = format!("{}{}{}", upper, lower, digits);
            prop_assert!(validate_password_strength(&password).is_ok());
        }
    }
}
