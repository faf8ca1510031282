use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::instrument;
use uuid::Uuid;

use super::AuthError;

/// Hash a password using a randomly-generated salt value
pub async fn new_hash(password: String) -> Result<String, AuthError> {
    let salt = Uuid::new_v4();
    hash_password(password, salt).await
}

#[instrument(skip(password))]
async fn hash_password(password: String, salt: Uuid) -> Result<String, AuthError> {
    let hash = tokio::task::spawn_blocking(move || {
        let saltstring = SaltString::encode_b64(salt.as_bytes())
            .map_err(|e| AuthError::PasswordHasherError(e.to_string()))?;

        let hash = Argon2::default()
            .hash_password(password.as_bytes(), saltstring.as_salt())
            .map_err(|e| AuthError::PasswordHasherError(e.to_string()))?;

        Ok::<_, AuthError>(hash.to_string())
    })
    .await
    .map_err(|e| AuthError::PasswordHasherError(e.to_string()))??;

    Ok(hash)
}

/// Verify that the given password matches the stored hash
#[instrument(skip_all)]
pub async fn verify_password(password: String, hash_str: String) -> Result<(), AuthError> {
    tokio::task::spawn_blocking(move || {
        let hash = PasswordHash::new(&hash_str)
            .map_err(|e| AuthError::PasswordHasherError(e.to_string()))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .map_err(|_| AuthError::IncorrectPassword)
    })
    .await
    .map_err(|e| AuthError::PasswordHasherError(e.to_string()))??;

    Ok(())
}
