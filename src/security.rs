//! Password hashing and verification.
//!
//! Credentials exist in plaintext only transiently inside the register/login
//! handlers; what the store persists is an Argon2 PHC string with the salt and
//! cost parameters embedded. The plaintext and the stored hash are never
//! comparable except through `verify_password`.

use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

/// Hash a plaintext password into an Argon2 PHC string.
///
/// The salt is random per call, so the same input yields a different encoded
/// output each time. A failure of the underlying primitive is unexpected and
/// treated as fatal to the request by callers.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!(e.to_string()))?
        .to_string();
    Ok(phc)
}

/// Verify a plaintext password against a stored PHC string.
///
/// Never errors: a wrong password and a malformed hash both return false
/// through the same path.
pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else {
        false
    }
}
