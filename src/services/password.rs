// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Argon2 password hashing.
//!
//! Hashing and verification are CPU-intensive and run under
//! `spawn_blocking` so they never stall the async runtime.

use crate::error::AppError;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
    Argon2,
};
use tokio::task;

/// Hash a password using Argon2id with a fresh random salt.
///
/// Returns the PHC string, which embeds algorithm, parameters, and salt.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to hash password: {e}")))
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing task panicked: {e}")))?
}

/// Check a password against a stored PHC hash string.
///
/// A malformed stored hash is an internal error, not a failed verification.
pub async fn verify_password(password: String, password_hash: String) -> Result<bool, AppError> {
    task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&password_hash).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Invalid password hash format: {e}"))
        })?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Password verification task panicked: {e}")))?
}
