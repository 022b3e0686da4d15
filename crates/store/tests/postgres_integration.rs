//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use common::UserId;
use domain::{
    Author, Book, CheckoutOrder, Favorite, GuestContact, ItemFormat, Money, Order, OrderLine,
    OrderStatus, Review, ShippingAddress, User,
};
use store::{
    CatalogStore, FavoriteStore, OrderStore, PostgresStore, ReviewStore, StatsStore, StoreError,
    UserStore,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Apply the schema once through a temporary pool
            let temp_pool = sqlx::PgPool::connect(&connection_string).await.unwrap();
            PostgresStore::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    // Create a fresh pool for each test to avoid connection issues
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query(
        "TRUNCATE TABLE order_lines, orders, reviews, favorites, books, users, authors CASCADE",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresStore::new(pool)
}

fn book(isbn: &str, title: &str, cents: i64) -> Book {
    Book::new(isbn, title, Money::from_cents(cents)).unwrap()
}

fn user(email: &str) -> User {
    User::new(email, "hash").unwrap()
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
    let store = get_test_store().await;

    let author = Author::new("Camus").unwrap();
    store.insert_author(&author).await.unwrap();

    let mut b = book("978-1", "L'Étranger", 890);
    b.category = "Roman".into();
    b.author_id = Some(author.id);
    store.insert_book(&b).await.unwrap();

    assert!(matches!(
        store.insert_book(&b).await,
        Err(StoreError::Conflict(_))
    ));

    let stored = store.get_book(&b.isbn).await.unwrap();
    assert_eq!(stored.title, "L'Étranger");
    assert_eq!(stored.price.cents(), 890);
    assert_eq!(stored.category, "Roman");
    assert_eq!(stored.author_id, Some(author.id));

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
    let store = get_test_store().await;

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
async fn user_round_trip_and_unique_email() {
    let store = get_test_store().await;

    let mut alice = user("alice@example.com");
    alice.issue_verification_code("123456".into(), chrono::Utc::now());
    store.insert_user(&alice).await.unwrap();

    let stored = store.get_user_by_email("alice@example.com").await.unwrap();
    assert_eq!(stored.id, alice.id);
    assert_eq!(stored.role, domain::Role::User);
    assert!(!stored.email_verified);
    assert_eq!(stored.verification_code.as_deref(), Some("123456"));
    assert!(stored.verification_expires_at.is_some());

    assert!(matches!(
        store.insert_user(&user("alice@example.com")).await,
        Err(StoreError::Conflict(_))
    ));

    // Renaming onto a taken email trips the same index
    let mut bob = user("bob@example.com");
    store.insert_user(&bob).await.unwrap();
    bob.email = "alice@example.com".into();
    assert!(matches!(
        store.update_user(&bob).await,
        Err(StoreError::Conflict(_))
    ));
}

#[tokio::test]
async fn one_cart_per_user() {
    let store = get_test_store().await;

    let alice = user("alice@example.com");
    store.insert_user(&alice).await.unwrap();

    store.insert_order(&Order::new_cart(alice.id)).await.unwrap();
    assert!(matches!(
        store.insert_order(&Order::new_cart(alice.id)).await,
        Err(StoreError::Conflict(_))
    ));

    // Checkout orders are unlimited.
    store.insert_order(&checkout_order(alice.id)).await.unwrap();
    store.insert_order(&checkout_order(alice.id)).await.unwrap();
}

#[tokio::test]
async fn cart_lookup_ignores_checkout_orders() {
    let store = get_test_store().await;

    let alice = user("alice@example.com");
    store.insert_user(&alice).await.unwrap();

    store.insert_order(&checkout_order(alice.id)).await.unwrap();
    assert!(store.cart_for_user(alice.id).await.unwrap().is_none());

    let cart = Order::new_cart(alice.id);
    store.insert_order(&cart).await.unwrap();
    let found = store.cart_for_user(alice.id).await.unwrap().unwrap();
    assert_eq!(found.id(), cart.id());
}

#[tokio::test]
async fn update_order_replaces_lines_wholesale() {
    let store = get_test_store().await;

    let alice = user("alice@example.com");
    store.insert_user(&alice).await.unwrap();

    let mut cart = Order::new_cart(alice.id);
    cart.replace_lines(vec![OrderLine::new(
        "978-1",
        "Un livre",
        ItemFormat::PaperNew,
        2,
        Money::from_cents(1000),
    )])
    .unwrap();
    store.insert_order(&cart).await.unwrap();

    cart.replace_lines(vec![
        OrderLine::new("978-2", "Autre", ItemFormat::Ebook, 1, Money::from_cents(500)),
        OrderLine::new("978-3", "Encore", ItemFormat::PaperUsed, 3, Money::from_cents(200)),
    ])
    .unwrap();
    store.update_order(&cart).await.unwrap();

    let stored = store.get_order(cart.id()).await.unwrap();
    assert_eq!(stored.lines().len(), 2);
    assert_eq!(stored.lines()[0].isbn.as_str(), "978-2");
    assert_eq!(stored.lines()[0].format, ItemFormat::Ebook);
    assert_eq!(stored.lines()[1].quantity, 3);
    assert_eq!(stored.subtotal().cents(), 1100);
}

#[tokio::test]
async fn status_change_is_persisted() {
    let store = get_test_store().await;

    let alice = user("alice@example.com");
    store.insert_user(&alice).await.unwrap();

    let mut order = checkout_order(alice.id);
    store.insert_order(&order).await.unwrap();

    order.transition_to(OrderStatus::Paid).unwrap();
    store.update_order(&order).await.unwrap();

    let stored = store.get_order(order.id()).await.unwrap();
    assert_eq!(stored.status(), OrderStatus::Paid);
    assert_eq!(stored.total().cents(), 1300);
}

#[tokio::test]
async fn guest_order_round_trip() {
    let store = get_test_store().await;

    let order = Order::checkout(CheckoutOrder {
        user_id: None,
        guest: Some(GuestContact {
            email: "invite@example.com".into(),
            first_name: "Jean".into(),
            last_name: "Dupont".into(),
            phone: Some("0612345678".into()),
        }),
        lines: vec![OrderLine::new(
            "978-1",
            "Un livre",
            ItemFormat::PaperNew,
            1,
            Money::from_cents(1000),
        )],
        shipping_address: ShippingAddress {
            street: "3 place Bellecour".into(),
            city: "Lyon".into(),
            postal_code: "69002".into(),
            country: "France".into(),
        },
        shipping_cost: Money::from_cents(300),
    })
    .unwrap();
    store.insert_order(&order).await.unwrap();

    let stored = store.get_order(order.id()).await.unwrap();
    assert!(stored.user_id().is_none());
    let guest = stored.guest().unwrap();
    assert_eq!(guest.email, "invite@example.com");
    assert_eq!(guest.phone.as_deref(), Some("0612345678"));
    let address = stored.shipping_address().unwrap();
    assert_eq!(address.street, "3 place Bellecour");
    assert_eq!(address.postal_code, "69002");
}

#[tokio::test]
async fn delete_order_cascades_to_lines() {
    let store = get_test_store().await;

    let alice = user("alice@example.com");
    store.insert_user(&alice).await.unwrap();

    let order = checkout_order(alice.id);
    store.insert_order(&order).await.unwrap();
    store.delete_order(order.id()).await.unwrap();

    assert!(matches!(
        store.get_order(order.id()).await,
        Err(StoreError::NotFound)
    ));
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_lines")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn review_upsert_keeps_identity() {
    let store = get_test_store().await;

    let alice = user("alice@example.com");
    store.insert_user(&alice).await.unwrap();
    store.insert_book(&book("978-1", "Un livre", 1000)).await.unwrap();

    let first = Review::new(alice.id, "978-1", 3, None).unwrap();
    let stored = store.upsert_review(&first).await.unwrap();

    let second = Review::new(alice.id, "978-1", 5, Some("Mieux".into())).unwrap();
    let replaced = store.upsert_review(&second).await.unwrap();

    assert_eq!(replaced.id, stored.id);
    assert_eq!(replaced.created_at, stored.created_at);
    assert_eq!(replaced.rating, 5);
    assert_eq!(
        store
            .list_reviews_for_book(&"978-1".into())
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn duplicate_favorite_rejected() {
    let store = get_test_store().await;

    let alice = user("alice@example.com");
    store.insert_user(&alice).await.unwrap();
    store.insert_book(&book("978-1", "Un livre", 1000)).await.unwrap();

    store
        .insert_favorite(&Favorite::new(alice.id, "978-1"))
        .await
        .unwrap();
    assert!(matches!(
        store
            .insert_favorite(&Favorite::new(alice.id, "978-1"))
            .await,
        Err(StoreError::Conflict(_))
    ));
}

#[tokio::test]
async fn stats_count_revenue_from_paid_orders() {
    let store = get_test_store().await;

    let alice = user("alice@example.com");
    store.insert_user(&alice).await.unwrap();
    store.insert_book(&book("978-1", "Un livre", 1000)).await.unwrap();

    let mut paid = checkout_order(alice.id);
    paid.transition_to(OrderStatus::Paid).unwrap();
    store.insert_order(&paid).await.unwrap();

    let pending = checkout_order(alice.id);
    store.insert_order(&pending).await.unwrap();

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.users, 1);
    assert_eq!(stats.books, 1);
    assert_eq!(stats.orders, 2);
    assert_eq!(stats.revenue_cents, 1300);
    assert_eq!(stats.orders_by_status.get("payment-pending"), Some(&1));
    assert_eq!(stats.orders_by_status.get("paid"), Some(&1));
}

#[tokio::test]
async fn unknown_stored_status_is_reported_as_corruption() {
    let store = get_test_store().await;

    let alice = user("alice@example.com");
    store.insert_user(&alice).await.unwrap();

    let order = checkout_order(alice.id);
    store.insert_order(&order).await.unwrap();

    sqlx::query("UPDATE orders SET status = 'bogus' WHERE id = $1")
        .bind(order.id().as_uuid())
        .execute(store.pool())
        .await
        .unwrap();

    assert!(matches!(
        store.get_order(order.id()).await,
        Err(StoreError::DataCorruption(_))
    ));
}
