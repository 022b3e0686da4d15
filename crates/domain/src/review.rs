//! Reviews and favorites, both keyed by a unique (user, book) pair.

use chrono::{DateTime, Utc};
use common::{FavoriteId, Isbn, ReviewId, UserId};
use serde::Serialize;

use crate::DomainError;

/// A user's review of a book. One per (user, book) pair; writing again
/// replaces rating and comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub isbn: Isbn,
    /// Integer rating, 1 to 5.
    pub rating: i16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    /// Creates a review with a validated rating.
    pub fn new(
        user_id: UserId,
        isbn: impl Into<Isbn>,
        rating: i16,
        comment: Option<String>,
    ) -> Result<Self, DomainError> {
        if !(1..=5).contains(&rating) {
            return Err(DomainError::validation(format!(
                "rating must be between 1 and 5, got {rating}"
            )));
        }
        let now = Utc::now();
        Ok(Self {
            id: ReviewId::new(),
            user_id,
            isbn: isbn.into(),
            rating,
            comment,
            created_at: now,
            updated_at: now,
        })
    }
}

/// A bookmark pairing a user with a book. Unique per (user, book).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Favorite {
    pub id: FavoriteId,
    pub user_id: UserId,
    pub isbn: Isbn,
    pub created_at: DateTime<Utc>,
}

impl Favorite {
    pub fn new(user_id: UserId, isbn: impl Into<Isbn>) -> Self {
        Self {
            id: FavoriteId::new(),
            user_id,
            isbn: isbn.into(),
            created_at: Utc::now(),
        }
    }
}
