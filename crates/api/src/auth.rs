//! Password hashing and the admin identity guard.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::http::HeaderMap;
use common::UserId;
use domain::User;
use store::UserStore;

use crate::error::ApiError;

/// Hashes a password with argon2 and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| ApiError::Internal("failed to hash password".to_string()))
}

/// Verifies a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), ApiError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| ApiError::Unauthorized("invalid credentials".to_string()))?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized("invalid credentials".to_string()))
}

/// Resolves the `X-User-Id` header to an admin user.
///
/// Missing or unknown identity is 401; a known non-admin is 403.
pub async fn require_admin<S: UserStore>(store: &S, headers: &HeaderMap) -> Result<User, ApiError> {
    let header = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing X-User-Id header".to_string()))?;

    let user_id = header
        .parse::<uuid::Uuid>()
        .map(UserId::from_uuid)
        .map_err(|_| ApiError::Unauthorized("invalid X-User-Id header".to_string()))?;

    let user = store
        .get_user(user_id)
        .await
        .map_err(|_| ApiError::Unauthorized("unknown user".to_string()))?;

    if !user.is_admin() {
        return Err(ApiError::Forbidden("admin role required".to_string()));
    }
    Ok(user)
}
