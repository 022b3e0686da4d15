use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{AuthorId, FavoriteId, Isbn, OrderId, ReviewId, UserId};
use domain::{Author, Book, Favorite, Order, Review, User};
use tokio::sync::RwLock;

use crate::{
    CatalogStore, FavoriteStore, OrderStore, REVENUE_STATUSES, Result, ReviewStore, StatsStore,
    StoreError, StoreStats, UserStore,
};

#[derive(Default)]
struct State {
    books: HashMap<Isbn, Book>,
    authors: HashMap<AuthorId, Author>,
    users: HashMap<UserId, User>,
    orders: HashMap<OrderId, Order>,
    reviews: HashMap<(UserId, Isbn), Review>,
    favorites: HashMap<FavoriteId, Favorite>,
}

/// In-memory store backed by hash maps behind an async lock.
///
/// Used in tests and when no `DATABASE_URL` is configured. Enforces the
/// same uniqueness rules as the PostgreSQL schema so either backend
/// reports the same conflicts.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_books(&self, category: Option<&str>) -> Result<Vec<Book>> {
        let state = self.state.read().await;
        let mut books: Vec<Book> = state
            .books
            .values()
            .filter(|b| category.is_none_or(|c| b.category == c))
            .cloned()
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(books)
    }

    async fn get_book(&self, isbn: &Isbn) -> Result<Book> {
        let state = self.state.read().await;
        state.books.get(isbn).cloned().ok_or(StoreError::NotFound)
    }

    async fn insert_book(&self, book: &Book) -> Result<()> {
        let mut state = self.state.write().await;
        if state.books.contains_key(&book.isbn) {
            return Err(StoreError::Conflict(format!(
                "book {} already exists",
                book.isbn
            )));
        }
        state.books.insert(book.isbn.clone(), book.clone());
        Ok(())
    }

    async fn update_book(&self, book: &Book) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.books.contains_key(&book.isbn) {
            return Err(StoreError::NotFound);
        }
        state.books.insert(book.isbn.clone(), book.clone());
        Ok(())
    }

    async fn delete_book(&self, isbn: &Isbn) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .books
            .remove(isbn)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn list_authors(&self) -> Result<Vec<Author>> {
        let state = self.state.read().await;
        let mut authors: Vec<Author> = state.authors.values().cloned().collect();
        authors.sort_by(|a, b| a.last_name.cmp(&b.last_name));
        Ok(authors)
    }

    async fn get_author(&self, id: AuthorId) -> Result<Author> {
        let state = self.state.read().await;
        state.authors.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn insert_author(&self, author: &Author) -> Result<()> {
        let mut state = self.state.write().await;
        state.authors.insert(author.id, author.clone());
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "email {} already registered",
                user.email
            )));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<User> {
        let state = self.state.read().await;
        state.users.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User> {
        let state = self.state.read().await;
        state
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user.id) {
            return Err(StoreError::NotFound);
        }
        if state
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::Conflict(format!(
                "email {} already registered",
                user.email
            )));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;
        if order.status() == domain::OrderStatus::Cart
            && let Some(user_id) = order.user_id()
            && state
                .orders
                .values()
                .any(|o| o.status() == domain::OrderStatus::Cart && o.user_id() == Some(user_id))
        {
            return Err(StoreError::Conflict("user already has a cart".into()));
        }
        state.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn update_order(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.orders.contains_key(&order.id()) {
            return Err(StoreError::NotFound);
        }
        state.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Order> {
        let state = self.state.read().await;
        state.orders.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn delete_order(&self, id: OrderId) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .orders
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state.orders.values().cloned().collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.user_id() == Some(user_id))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }

    async fn cart_for_user(&self, user_id: UserId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .values()
            .find(|o| o.status() == domain::OrderStatus::Cart && o.user_id() == Some(user_id))
            .cloned())
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn upsert_review(&self, review: &Review) -> Result<Review> {
        let mut state = self.state.write().await;
        let key = (review.user_id, review.isbn.clone());
        let stored = match state.reviews.get(&key) {
            Some(existing) => {
                // Replace keeps the original identity and creation time.
                let mut updated = review.clone();
                updated.id = existing.id;
                updated.created_at = existing.created_at;
                updated
            }
            None => review.clone(),
        };
        state.reviews.insert(key, stored.clone());
        Ok(stored)
    }

    async fn list_reviews_for_book(&self, isbn: &Isbn) -> Result<Vec<Review>> {
        let state = self.state.read().await;
        let mut reviews: Vec<Review> = state
            .reviews
            .values()
            .filter(|r| &r.isbn == isbn)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn get_review(&self, id: ReviewId) -> Result<Review> {
        let state = self.state.read().await;
        state
            .reviews
            .values()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn delete_review(&self, id: ReviewId) -> Result<()> {
        let mut state = self.state.write().await;
        let key = state
            .reviews
            .iter()
            .find(|(_, r)| r.id == id)
            .map(|(k, _)| k.clone());
        match key {
            Some(key) => {
                state.reviews.remove(&key);
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }
}

#[async_trait]
impl FavoriteStore for MemoryStore {
    async fn insert_favorite(&self, favorite: &Favorite) -> Result<()> {
        let mut state = self.state.write().await;
        if state
            .favorites
            .values()
            .any(|f| f.user_id == favorite.user_id && f.isbn == favorite.isbn)
        {
            return Err(StoreError::Conflict(format!(
                "book {} is already a favorite",
                favorite.isbn
            )));
        }
        state.favorites.insert(favorite.id, favorite.clone());
        Ok(())
    }

    async fn list_favorites_for_user(&self, user_id: UserId) -> Result<Vec<Favorite>> {
        let state = self.state.read().await;
        let mut favorites: Vec<Favorite> = state
            .favorites
            .values()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        favorites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(favorites)
    }

    async fn delete_favorite(&self, id: FavoriteId) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .favorites
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl StatsStore for MemoryStore {
    async fn stats(&self) -> Result<StoreStats> {
        let state = self.state.read().await;

        let mut orders_by_status: HashMap<String, u64> = HashMap::new();
        let mut revenue_cents = 0i64;
        for order in state.orders.values() {
            *orders_by_status
                .entry(order.status().as_str().to_string())
                .or_default() += 1;
            if REVENUE_STATUSES.contains(&order.status()) {
                revenue_cents += order.total().cents();
            }
        }

        Ok(StoreStats {
            users: state.users.len() as u64,
            books: state.books.len() as u64,
            orders: state.orders.len() as u64,
            reviews: state.reviews.len() as u64,
            revenue_cents,
            orders_by_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{
        CheckoutOrder, ItemFormat, Money, OrderLine, OrderStatus, ShippingAddress,
    };

    fn book(isbn: &str, title: &str, cents: i64) -> Book {
        Book::new(isbn, title, Money::from_cents(cents)).unwrap()
    }

    fn checkout_order(user_id: UserId) -> Order {
        Order::checkout(CheckoutOrder {
            user_id: Some(user_id),
            guest: None,
            lines: vec![OrderLine::new(
                "978-1",
                "Un livre",
                ItemFormat::PaperNew,
                1,
                Money::from_cents(1000),
            )],
            shipping_address: ShippingAddress {
                street: "12 rue des Lilas".into(),
                city: "Lyon".into(),
                postal_code: "69003".into(),
                country: "France".into(),
            },
            shipping_cost: Money::from_cents(300),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn book_crud_round_trip() {
        let store = MemoryStore::new();
        let mut b = book("978-1", "L'Étranger", 890);
        store.insert_book(&b).await.unwrap();

        assert!(matches!(
            store.insert_book(&b).await,
            Err(StoreError::Conflict(_))
        ));

        b.stock = 7;
        store.update_book(&b).await.unwrap();
        assert_eq!(store.get_book(&b.isbn).await.unwrap().stock, 7);

        store.delete_book(&b.isbn).await.unwrap();
        assert!(matches!(
            store.get_book(&b.isbn).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn list_books_filters_by_category() {
        let store = MemoryStore::new();
        let mut roman = book("978-1", "Roman", 1000);
        roman.category = "Roman".into();
        store.insert_book(&roman).await.unwrap();
        store.insert_book(&book("978-2", "Autre", 500)).await.unwrap();

        assert_eq!(store.list_books(None).await.unwrap().len(), 2);
        let filtered = store.list_books(Some("Roman")).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "Roman");
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let store = MemoryStore::new();
        let alice = User::new("alice@example.com", "hash").unwrap();
        store.insert_user(&alice).await.unwrap();

        let clone = User::new("alice@example.com", "hash").unwrap();
        assert!(matches!(
            store.insert_user(&clone).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn one_cart_per_user() {
        let store = MemoryStore::new();
        let user_id = UserId::new();

        store.insert_order(&Order::new_cart(user_id)).await.unwrap();
        assert!(matches!(
            store.insert_order(&Order::new_cart(user_id)).await,
            Err(StoreError::Conflict(_))
        ));

        // Checkout orders are unlimited.
        store.insert_order(&checkout_order(user_id)).await.unwrap();
        store.insert_order(&checkout_order(user_id)).await.unwrap();
    }

    #[tokio::test]
    async fn cart_lookup_ignores_checkout_orders() {
        let store = MemoryStore::new();
        let user_id = UserId::new();
        store.insert_order(&checkout_order(user_id)).await.unwrap();
        assert!(store.cart_for_user(user_id).await.unwrap().is_none());

        let cart = Order::new_cart(user_id);
        store.insert_order(&cart).await.unwrap();
        let found = store.cart_for_user(user_id).await.unwrap().unwrap();
        assert_eq!(found.id(), cart.id());
    }

    #[tokio::test]
    async fn review_upsert_keeps_identity() {
        let store = MemoryStore::new();
        let user_id = UserId::new();

        let first = Review::new(user_id, "978-1", 3, None).unwrap();
        let stored = store.upsert_review(&first).await.unwrap();

        let second = Review::new(user_id, "978-1", 5, Some("Mieux".into())).unwrap();
        let replaced = store.upsert_review(&second).await.unwrap();

        assert_eq!(replaced.id, stored.id);
        assert_eq!(replaced.created_at, stored.created_at);
        assert_eq!(replaced.rating, 5);
        assert_eq!(store.list_reviews_for_book(&"978-1".into()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_favorite_rejected() {
        let store = MemoryStore::new();
        let user_id = UserId::new();
        store
            .insert_favorite(&Favorite::new(user_id, "978-1"))
            .await
            .unwrap();
        assert!(matches!(
            store.insert_favorite(&Favorite::new(user_id, "978-1")).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn stats_count_revenue_from_paid_orders() {
        let store = MemoryStore::new();
        let user_id = UserId::new();

        let mut paid = checkout_order(user_id);
        paid.transition_to(OrderStatus::Paid).unwrap();
        store.insert_order(&paid).await.unwrap();

        let pending = checkout_order(user_id);
        store.insert_order(&pending).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.orders, 2);
        assert_eq!(stats.revenue_cents, 1300);
        assert_eq!(stats.orders_by_status.get("payment-pending"), Some(&1));
        assert_eq!(stats.orders_by_status.get("paid"), Some(&1));
    }
}
