//! Password hashing with Argon2id.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;

use crate::domain::errors::{ForumError, ForumResult};

/// Hash a password into a PHC string (algorithm, params and salt included).
pub fn hash_password(password: &str) -> ForumResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ForumError::Credential(e.to_string()))
}

/// Check a password against a stored PHC string.
pub fn verify_password(password: &str, stored_hash: &str) -> ForumResult<bool> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| ForumError::Credential(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
