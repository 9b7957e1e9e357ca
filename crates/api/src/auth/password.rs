//! Password hashing with Argon2

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use subtle::ConstantTimeEq;

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Check super-admin credentials.
///
/// The email comparison is case-insensitive and constant time. The password
/// hash is verified even when the email does not match so both failure modes
/// take the same time.
pub fn verify_admin_credentials(
    email: &str,
    password: &str,
    expected_email: &str,
    password_hash: &str,
) -> Result<bool, PasswordError> {
    let given = email.trim().to_lowercase();
    let email_ok: bool = given.as_bytes().ct_eq(expected_email.as_bytes()).into();
    let password_ok = verify_password(password, password_hash)?;
    Ok(email_ok && password_ok)
}

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("Invalid password hash: {0}")]
    InvalidHash(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = "SecureP@ssw0rd123";
        let hash = hash_password(password).expect("Failed to hash password");

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(password, &hash).expect("Verification failed"));
        assert!(!verify_password("wrong_password", &hash).expect("Verification failed"));
    }

    #[test]
    fn test_invalid_hash_is_an_error() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(PasswordError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_admin_credentials() {
        let hash = hash_password("Sup3r-Secret!").unwrap();
        let expected = "admin@dineflow.test";

        assert!(verify_admin_credentials("Admin@Dineflow.test ", "Sup3r-Secret!", expected, &hash).unwrap());
        assert!(!verify_admin_credentials("other@dineflow.test", "Sup3r-Secret!", expected, &hash).unwrap());
        assert!(!verify_admin_credentials(expected, "wrong", expected, &hash).unwrap());
    }
}
