//! Route handlers, one module per resource.

pub mod admin;
pub mod authors;
pub mod books;
pub mod cart;
pub mod favorites;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod reviews;
pub mod users;

use common::UserId;

use crate::error::ApiError;

/// Parses a path or query segment into a UUID-backed identifier.
pub(crate) fn parse_uuid_id<T: From<uuid::Uuid>>(id: &str) -> Result<T, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("invalid id format: {e}")))?;
    Ok(T::from(uuid))
}

/// Parses a required user id.
pub(crate) fn parse_user_id(id: &str) -> Result<UserId, ApiError> {
    parse_uuid_id::<UserId>(id)
}
