//! Password hashing and the minimal password policy applied at registration.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::Rng;
use thiserror::Error;

use crate::errors::ServiceError;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("Password too short: minimum {min_length} characters required")]
    TooShort { min_length: usize },

    #[error("Password too long: maximum {max_length} characters allowed")]
    TooLong { max_length: usize },

    #[error("Password must not be only whitespace")]
    Blank,
}

impl From<PasswordPolicyError> for ServiceError {
    fn from(err: PasswordPolicyError) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
        }
    }
}

impl PasswordPolicy {
    pub fn check(&self, password: &str) -> Result<(), PasswordPolicyError> {
        let len = password.chars().count();
        if password.trim().is_empty() {
            return Err(PasswordPolicyError::Blank);
        }
        if len < self.min_length {
            return Err(PasswordPolicyError::TooShort {
                min_length: self.min_length,
            });
        }
        if len > self.max_length {
            return Err(PasswordPolicyError::TooLong {
                max_length: self.max_length,
            });
        }
        Ok(())
    }
}

/// Well-formed argon2id hash with the default cost parameters. Logins for
/// unknown emails verify against it so they take as long as a wrong password.
pub const DUMMY_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$ZlMOqsLsIcmGX2CDJnRHVw$jQZxvqZcWuKjxCgvR3qfFahJG7a4n7TB48RLUhq/wVQ";

/// Hashes a password into an argon2id PHC string with a fresh 16-byte salt.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt_bytes: [u8; 16] = rand::thread_rng().gen();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| ServiceError::HashError(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::HashError(e.to_string()))
}

/// Returns `Ok(false)` on mismatch; only a malformed stored hash is an error.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, ServiceError> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| ServiceError::HashError(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn hash_verifies_only_the_original_password() {
        let hash = hash_password("admin123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("admin123", &hash).unwrap());
        assert!(!verify_password("admin124", &hash).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        let a = hash_password("farmer123").unwrap();
        let b = hash_password("farmer123").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert_matches!(
            verify_password("x", "plaintext"),
            Err(ServiceError::HashError(_))
        );
    }

    #[test]
    fn dummy_hash_parses_and_matches_nothing() {
        assert!(!verify_password("admin123", DUMMY_PASSWORD_HASH).unwrap());
        assert!(!verify_password("", DUMMY_PASSWORD_HASH).unwrap());
    }

    #[test]
    fn policy_limits() {
        let policy = PasswordPolicy::default();
        assert_eq!(policy.check("admin123"), Ok(()));
        assert_eq!(
            policy.check("short"),
            Err(PasswordPolicyError::TooShort { min_length: 8 })
        );
        assert_eq!(policy.check("        "), Err(PasswordPolicyError::Blank));
        assert_eq!(
            policy.check(&"x".repeat(129)),
            Err(PasswordPolicyError::TooLong { max_length: 128 })
        );
    }
}
