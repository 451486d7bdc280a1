use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Password must be present.")]
    Empty,
    #[error("Password could not be hashed: {0}")]
    Hash(String),
}

lazy_static! {
    // Verified against when the username is unknown, so both login failures cost one argon2 run.
    static ref DUMMY_HASH: String =
        hash_password("cookbook-dummy-password").unwrap_or_default();
}

pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    if plain.is_empty() {
        return Err(PasswordError::Empty);
    }
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            PasswordError::Hash(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Argon2 compares the derived digest in constant time.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Forces the dummy hash at startup instead of on the first unknown-username login.
pub fn prime_dummy_hash() {
    lazy_static::initialize(&DUMMY_HASH);
}

pub fn burn_verification(plain: &str) {
    let _ = verify_password(plain, &DUMMY_HASH);
}
