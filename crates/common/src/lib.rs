//! Shared identifier types used across the bookstore backend.

mod types;

pub use types::{AuthorId, FavoriteId, Isbn, OrderId, ReviewId, UserId};
