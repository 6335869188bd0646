//! Password hashing for the credential field (Argon2id, PHC strings)

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::{StorageError, StorageResult};

/// Hash a password; the result is what gets stored in `StoredUser::password`
///
/// # Errors
/// Returns an error if hashing fails
pub fn hash_password(password: &str) -> StorageResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| StorageError::Credential(format!("Failed to hash password: {e}")))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC hash
///
/// # Errors
/// Returns an error if the stored hash is malformed
pub fn verify_password(password: &str, stored_hash: &str) -> StorageResult<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| StorageError::Credential(format!("Invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
