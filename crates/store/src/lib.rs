//! Persistence layer for the bookstore backend.
//!
//! Exposes one narrow trait per concern (catalog, users, orders, reviews,
//! favorites, stats) plus a [`Store`] supertrait that the API layer is
//! generic over. Two implementations ship: [`MemoryStore`] for tests and
//! DB-less development, and [`PostgresStore`] for production.

mod memory;
mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use common::{AuthorId, FavoriteId, Isbn, OrderId, ReviewId, UserId};
use domain::{Author, Book, Favorite, Order, Review, User};
use serde::Serialize;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Errors that can occur in store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness rule was violated (duplicate email, second cart,
    /// duplicate favorite, ...).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The requested row does not exist.
    #[error("not found")]
    NotFound,

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value could not be mapped back to its domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Book and author persistence.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Lists all books, optionally narrowed to one category.
    async fn list_books(&self, category: Option<&str>) -> Result<Vec<Book>>;

    /// Fetches one book by its catalog code.
    async fn get_book(&self, isbn: &Isbn) -> Result<Book>;

    /// Inserts a new book. Fails with [`StoreError::Conflict`] when the
    /// catalog code is already taken.
    async fn insert_book(&self, book: &Book) -> Result<()>;

    /// Overwrites an existing book.
    async fn update_book(&self, book: &Book) -> Result<()>;

    /// Deletes a book.
    async fn delete_book(&self, isbn: &Isbn) -> Result<()>;

    /// Lists all authors.
    async fn list_authors(&self) -> Result<Vec<Author>>;

    /// Fetches one author.
    async fn get_author(&self, id: AuthorId) -> Result<Author>;

    /// Inserts a new author.
    async fn insert_author(&self, author: &Author) -> Result<()>;
}

/// User account persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a new user. Fails with [`StoreError::Conflict`] when the
    /// email is already registered.
    async fn insert_user(&self, user: &User) -> Result<()>;

    /// Fetches one user by id.
    async fn get_user(&self, id: UserId) -> Result<User>;

    /// Fetches one user by email.
    async fn get_user_by_email(&self, email: &str) -> Result<User>;

    /// Overwrites an existing user.
    async fn update_user(&self, user: &User) -> Result<()>;

    /// Deletes a user.
    async fn delete_user(&self, id: UserId) -> Result<()>;

    /// Lists all users.
    async fn list_users(&self) -> Result<Vec<User>>;
}

/// Order and cart persistence.
///
/// The cart is an order in status `cart`; at most one exists per user,
/// enforced here so concurrent cart creations cannot race past the check.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new order with its lines. Fails with
    /// [`StoreError::Conflict`] when it is a cart and the user already
    /// has one.
    async fn insert_order(&self, order: &Order) -> Result<()>;

    /// Overwrites an order's header and wholesale-replaces its lines,
    /// atomically.
    async fn update_order(&self, order: &Order) -> Result<()>;

    /// Fetches one order with its lines.
    async fn get_order(&self, id: OrderId) -> Result<Order>;

    /// Deletes an order and its lines.
    async fn delete_order(&self, id: OrderId) -> Result<()>;

    /// Lists all orders, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Lists a user's orders, newest first.
    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Fetches the user's cart, if one exists.
    async fn cart_for_user(&self, user_id: UserId) -> Result<Option<Order>>;
}

/// Review persistence.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Inserts or replaces the user's review of a book. A replace keeps
    /// the original id and creation time.
    async fn upsert_review(&self, review: &Review) -> Result<Review>;

    /// Lists all reviews for a book.
    async fn list_reviews_for_book(&self, isbn: &Isbn) -> Result<Vec<Review>>;

    /// Fetches one review.
    async fn get_review(&self, id: ReviewId) -> Result<Review>;

    /// Deletes a review.
    async fn delete_review(&self, id: ReviewId) -> Result<()>;
}

/// Favorite persistence.
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    /// Inserts a favorite. Fails with [`StoreError::Conflict`] when the
    /// user already favorited the book.
    async fn insert_favorite(&self, favorite: &Favorite) -> Result<()>;

    /// Lists a user's favorites.
    async fn list_favorites_for_user(&self, user_id: UserId) -> Result<Vec<Favorite>>;

    /// Deletes a favorite.
    async fn delete_favorite(&self, id: FavoriteId) -> Result<()>;
}

/// Aggregate counters for the admin dashboard.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    pub users: u64,
    pub books: u64,
    pub orders: u64,
    pub reviews: u64,
    /// Revenue in cents over orders that reached a paid state.
    pub revenue_cents: i64,
    /// Order count per wire status string.
    pub orders_by_status: HashMap<String, u64>,
}

/// Statistics queries.
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn stats(&self) -> Result<StoreStats>;
}

/// Everything the API layer needs from persistence.
pub trait Store:
    CatalogStore
    + UserStore
    + OrderStore
    + ReviewStore
    + FavoriteStore
    + StatsStore
    + Clone
    + Send
    + Sync
    + 'static
{
}

impl<T> Store for T where
    T: CatalogStore
        + UserStore
        + OrderStore
        + ReviewStore
        + FavoriteStore
        + StatsStore
        + Clone
        + Send
        + Sync
        + 'static
{
}

/// Statuses that count toward revenue. An order contributes once payment
/// succeeded, whatever fulfillment step it has reached since.
pub(crate) const REVENUE_STATUSES: [domain::OrderStatus; 5] = [
    domain::OrderStatus::Paid,
    domain::OrderStatus::Preparing,
    domain::OrderStatus::Shipped,
    domain::OrderStatus::Delivered,
    domain::OrderStatus::EbookAccessGranted,
];
