//! Argon2 password hashing

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("Failed to hash password: {0}")]
pub struct PasswordError(pub(crate) String);

/// Hash a plaintext password into an Argon2 PHC string with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError(e.to_string()))
}

/// Whether `value` already is an Argon2 PHC string.
pub fn is_hashed(value: &str) -> bool {
    PasswordHash::new(value)
        .map(|hash| hash.algorithm.as_str().starts_with("argon2"))
        .unwrap_or(false)
}

/// Hash `value` unless it already is a PHC string, so a stored hash is
/// never hashed a second time.
pub fn ensure_hashed(value: &str) -> Result<String, PasswordError> {
    if is_hashed(value) {
        Ok(value.to_string())
    } else {
        hash_password(value)
    }
}

/// Check a candidate password against a stored hash. Malformed hashes
/// simply fail verification.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
