use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::{AuthorId, FavoriteId, Isbn, OrderId, ReviewId, UserId};
use domain::{
    Author, Book, Favorite, GuestContact, ItemFormat, Money, Order, OrderLine, OrderStatus,
    Review, Role, ShippingAddress, User,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    CatalogStore, FavoriteStore, OrderStore, Result, ReviewStore, StatsStore, StoreError,
    StoreStats, UserStore,
};

/// PostgreSQL-backed store.
///
/// Uniqueness rules live in the schema: a unique index on users.email,
/// a partial unique index allowing one `cart` order per user, and unique
/// (user, book) pairs for reviews and favorites. Violations surface as
/// [`StoreError::Conflict`].
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

fn conflict_on_unique(e: sqlx::Error, message: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return StoreError::Conflict(message.to_string());
    }
    StoreError::Database(e)
}

fn row_to_book(row: &PgRow) -> Result<Book> {
    let stock: i32 = row.try_get("stock")?;
    let stock = u32::try_from(stock)
        .map_err(|_| StoreError::DataCorruption(format!("negative stock {stock}")))?;

    Ok(Book {
        isbn: Isbn::from(row.try_get::<String, _>("isbn")?),
        title: row.try_get("title")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock,
        synopsis: row.try_get("synopsis")?,
        category: row.try_get("category")?,
        published_on: row.try_get::<Option<NaiveDate>, _>("published_on")?,
        author_id: row
            .try_get::<Option<Uuid>, _>("author_id")?
            .map(AuthorId::from_uuid),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_author(row: &PgRow) -> Result<Author> {
    Ok(Author {
        id: AuthorId::from_uuid(row.try_get::<Uuid, _>("id")?),
        last_name: row.try_get("last_name")?,
        first_name: row.try_get("first_name")?,
        biography: row.try_get("biography")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_user(row: &PgRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    let role = Role::parse(&role)
        .ok_or_else(|| StoreError::DataCorruption(format!("unknown role {role:?}")))?;

    Ok(User {
        id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        phone: row.try_get("phone")?,
        street: row.try_get("street")?,
        postal_code: row.try_get("postal_code")?,
        city: row.try_get("city")?,
        country: row.try_get("country")?,
        email_verified: row.try_get("email_verified")?,
        verification_code: row.try_get("verification_code")?,
        verification_expires_at: row.try_get("verification_expires_at")?,
        role,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order(row: &PgRow, lines: Vec<OrderLine>) -> Result<Order> {
    let status: String = row.try_get("status")?;
    let status = OrderStatus::parse(&status)
        .ok_or_else(|| StoreError::DataCorruption(format!("unknown order status {status:?}")))?;

    let guest = match row.try_get::<Option<String>, _>("guest_email")? {
        Some(email) => Some(GuestContact {
            email,
            first_name: row
                .try_get::<Option<String>, _>("guest_first_name")?
                .unwrap_or_default(),
            last_name: row
                .try_get::<Option<String>, _>("guest_last_name")?
                .unwrap_or_default(),
            phone: row.try_get("guest_phone")?,
        }),
        None => None,
    };

    let shipping_address = match row.try_get::<Option<String>, _>("shipping_street")? {
        Some(street) => Some(ShippingAddress {
            street,
            city: row
                .try_get::<Option<String>, _>("shipping_city")?
                .unwrap_or_default(),
            postal_code: row
                .try_get::<Option<String>, _>("shipping_postal_code")?
                .unwrap_or_default(),
            country: row
                .try_get::<Option<String>, _>("shipping_country")?
                .unwrap_or_default(),
        }),
        None => None,
    };

    Ok(Order::from_parts(
        OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        row.try_get::<Option<Uuid>, _>("user_id")?
            .map(UserId::from_uuid),
        guest,
        status,
        lines,
        Money::from_cents(row.try_get("shipping_cost_cents")?),
        shipping_address,
        row.try_get::<DateTime<Utc>, _>("created_at")?,
        row.try_get::<DateTime<Utc>, _>("updated_at")?,
    ))
}

fn row_to_line(row: &PgRow) -> Result<OrderLine> {
    let format: String = row.try_get("format")?;
    let format = ItemFormat::parse(&format)
        .ok_or_else(|| StoreError::DataCorruption(format!("unknown item format {format:?}")))?;
    let quantity: i32 = row.try_get("quantity")?;
    let quantity = u32::try_from(quantity)
        .map_err(|_| StoreError::DataCorruption(format!("negative quantity {quantity}")))?;

    Ok(OrderLine {
        isbn: Isbn::from(row.try_get::<String, _>("isbn")?),
        title: row.try_get("title")?,
        format,
        quantity,
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
    })
}

fn row_to_review(row: &PgRow) -> Result<Review> {
    Ok(Review {
        id: ReviewId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        isbn: Isbn::from(row.try_get::<String, _>("isbn")?),
        rating: row.try_get("rating")?,
        comment: row.try_get("comment")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_favorite(row: &PgRow) -> Result<Favorite> {
    Ok(Favorite {
        id: FavoriteId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        isbn: Isbn::from(row.try_get::<String, _>("isbn")?),
        created_at: row.try_get("created_at")?,
    })
}

const ORDER_COLUMNS: &str = "id, user_id, guest_email, guest_first_name, guest_last_name, \
     guest_phone, status, shipping_cost_cents, shipping_street, shipping_city, \
     shipping_postal_code, shipping_country, created_at, updated_at";

impl PostgresStore {
    async fn lines_for_order<'e, E>(&self, executor: E, order_id: OrderId) -> Result<Vec<OrderLine>>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let rows = sqlx::query(
            r#"
            SELECT isbn, title, format, quantity, unit_price_cents
            FROM order_lines
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(executor)
        .await?;

        rows.iter().map(row_to_line).collect()
    }

    async fn insert_lines(
        &self,
        tx: &mut sqlx::PgTransaction<'_>,
        order: &Order,
    ) -> Result<()> {
        for line in order.lines() {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, isbn, title, format, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order.id().as_uuid())
            .bind(line.isbn.as_str())
            .bind(&line.title)
            .bind(line.format.as_str())
            .bind(line.quantity as i32)
            .bind(line.unit_price.cents())
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn orders_with_lines(&self, rows: Vec<PgRow>) -> Result<Vec<Order>> {
        let mut orders = Vec::with_capacity(rows.len());
        for row in &rows {
            let id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
            let lines = self.lines_for_order(&self.pool, id).await?;
            orders.push(row_to_order(row, lines)?);
        }
        Ok(orders)
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn list_books(&self, category: Option<&str>) -> Result<Vec<Book>> {
        let rows = match category {
            Some(category) => {
                sqlx::query(
                    r#"
                    SELECT isbn, title, price_cents, stock, synopsis, category,
                           published_on, author_id, created_at, updated_at
                    FROM books
                    WHERE category = $1
                    ORDER BY title ASC
                    "#,
                )
                .bind(category)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT isbn, title, price_cents, stock, synopsis, category,
                           published_on, author_id, created_at, updated_at
                    FROM books
                    ORDER BY title ASC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(row_to_book).collect()
    }

    async fn get_book(&self, isbn: &Isbn) -> Result<Book> {
        let row = sqlx::query(
            r#"
            SELECT isbn, title, price_cents, stock, synopsis, category,
                   published_on, author_id, created_at, updated_at
            FROM books
            WHERE isbn = $1
            "#,
        )
        .bind(isbn.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row_to_book(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn insert_book(&self, book: &Book) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO books (isbn, title, price_cents, stock, synopsis, category,
                               published_on, author_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(book.isbn.as_str())
        .bind(&book.title)
        .bind(book.price.cents())
        .bind(book.stock as i32)
        .bind(&book.synopsis)
        .bind(&book.category)
        .bind(book.published_on)
        .bind(book.author_id.map(|id| id.as_uuid()))
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "book already exists"))?;

        Ok(())
    }

    async fn update_book(&self, book: &Book) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = $2, price_cents = $3, stock = $4, synopsis = $5,
                category = $6, published_on = $7, author_id = $8, updated_at = $9
            WHERE isbn = $1
            "#,
        )
        .bind(book.isbn.as_str())
        .bind(&book.title)
        .bind(book.price.cents())
        .bind(book.stock as i32)
        .bind(&book.synopsis)
        .bind(&book.category)
        .bind(book.published_on)
        .bind(book.author_id.map(|id| id.as_uuid()))
        .bind(book.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_book(&self, isbn: &Isbn) -> Result<()> {
        let result = sqlx::query("DELETE FROM books WHERE isbn = $1")
            .bind(isbn.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_authors(&self) -> Result<Vec<Author>> {
        let rows = sqlx::query(
            r#"
            SELECT id, last_name, first_name, biography, created_at, updated_at
            FROM authors
            ORDER BY last_name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_author).collect()
    }

    async fn get_author(&self, id: AuthorId) -> Result<Author> {
        let row = sqlx::query(
            r#"
            SELECT id, last_name, first_name, biography, created_at, updated_at
            FROM authors
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row_to_author(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn insert_author(&self, author: &Author) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO authors (id, last_name, first_name, biography, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(author.id.as_uuid())
        .bind(&author.last_name)
        .bind(&author.first_name)
        .bind(&author.biography)
        .bind(author.created_at)
        .bind(author.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name, phone,
                               street, postal_code, city, country, email_verified,
                               verification_code, verification_expires_at, role,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.street)
        .bind(&user.postal_code)
        .bind(&user.city)
        .bind(&user.country)
        .bind(user.email_verified)
        .bind(&user.verification_code)
        .bind(user.verification_expires_at)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email already registered"))?;

        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<User> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row_to_user(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User> {
        let row = sqlx::query("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row_to_user(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, password_hash = $3, first_name = $4, last_name = $5,
                phone = $6, street = $7, postal_code = $8, city = $9, country = $10,
                email_verified = $11, verification_code = $12,
                verification_expires_at = $13, role = $14, updated_at = $15
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.street)
        .bind(&user.postal_code)
        .bind(&user.city)
        .bind(&user.country)
        .bind(user.email_verified)
        .bind(&user.verification_code)
        .bind(user.verification_expires_at)
        .bind(user.role.as_str())
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email already registered"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_user).collect()
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, guest_email, guest_first_name, guest_last_name,
                                guest_phone, status, subtotal_cents, shipping_cost_cents,
                                total_cents, shipping_street, shipping_city,
                                shipping_postal_code, shipping_country, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.user_id().map(|id| id.as_uuid()))
        .bind(order.guest().map(|g| g.email.clone()))
        .bind(order.guest().map(|g| g.first_name.clone()))
        .bind(order.guest().map(|g| g.last_name.clone()))
        .bind(order.guest().and_then(|g| g.phone.clone()))
        .bind(order.status().as_str())
        .bind(order.subtotal().cents())
        .bind(order.shipping_cost().cents())
        .bind(order.total().cents())
        .bind(order.shipping_address().map(|a| a.street.clone()))
        .bind(order.shipping_address().map(|a| a.city.clone()))
        .bind(order.shipping_address().map(|a| a.postal_code.clone()))
        .bind(order.shipping_address().map(|a| a.country.clone()))
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "user already has a cart"))?;

        self.insert_lines(&mut tx, order).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn update_order(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, subtotal_cents = $3, shipping_cost_cents = $4,
                total_cents = $5, shipping_street = $6, shipping_city = $7,
                shipping_postal_code = $8, shipping_country = $9, updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.status().as_str())
        .bind(order.subtotal().cents())
        .bind(order.shipping_cost().cents())
        .bind(order.total().cents())
        .bind(order.shipping_address().map(|a| a.street.clone()))
        .bind(order.shipping_address().map(|a| a.city.clone()))
        .bind(order.shipping_address().map(|a| a.postal_code.clone()))
        .bind(order.shipping_address().map(|a| a.country.clone()))
        .bind(order.updated_at())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        sqlx::query("DELETE FROM order_lines WHERE order_id = $1")
            .bind(order.id().as_uuid())
            .execute(&mut *tx)
            .await?;
        self.insert_lines(&mut tx, order).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Order> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let lines = self.lines_for_order(&self.pool, id).await?;
                row_to_order(&row, lines)
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_order(&self, id: OrderId) -> Result<()> {
        // Lines cascade with the order.
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        self.orders_with_lines(rows).await
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        self.orders_with_lines(rows).await
    }

    async fn cart_for_user(&self, user_id: UserId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 AND status = 'cart'"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
                let lines = self.lines_for_order(&self.pool, id).await?;
                Ok(Some(row_to_order(&row, lines)?))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ReviewStore for PostgresStore {
    async fn upsert_review(&self, review: &Review) -> Result<Review> {
        // The conflict arm keeps the original id and creation time.
        let row = sqlx::query(
            r#"
            INSERT INTO reviews (id, user_id, isbn, rating, comment, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, isbn) DO UPDATE SET
                rating = EXCLUDED.rating,
                comment = EXCLUDED.comment,
                updated_at = EXCLUDED.updated_at
            RETURNING id, user_id, isbn, rating, comment, created_at, updated_at
            "#,
        )
        .bind(review.id.as_uuid())
        .bind(review.user_id.as_uuid())
        .bind(review.isbn.as_str())
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.created_at)
        .bind(review.updated_at)
        .fetch_one(&self.pool)
        .await?;

        row_to_review(&row)
    }

    async fn list_reviews_for_book(&self, isbn: &Isbn) -> Result<Vec<Review>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, isbn, rating, comment, created_at, updated_at
            FROM reviews
            WHERE isbn = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(isbn.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_review).collect()
    }

    async fn get_review(&self, id: ReviewId) -> Result<Review> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, isbn, rating, comment, created_at, updated_at
            FROM reviews
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row_to_review(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_review(&self, id: ReviewId) -> Result<()> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl FavoriteStore for PostgresStore {
    async fn insert_favorite(&self, favorite: &Favorite) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO favorites (id, user_id, isbn, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(favorite.id.as_uuid())
        .bind(favorite.user_id.as_uuid())
        .bind(favorite.isbn.as_str())
        .bind(favorite.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "book is already a favorite"))?;

        Ok(())
    }

    async fn list_favorites_for_user(&self, user_id: UserId) -> Result<Vec<Favorite>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, isbn, created_at
            FROM favorites
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_favorite).collect()
    }

    async fn delete_favorite(&self, id: FavoriteId) -> Result<()> {
        let result = sqlx::query("DELETE FROM favorites WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl StatsStore for PostgresStore {
    async fn stats(&self) -> Result<StoreStats> {
        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let books: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        let reviews: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
            .fetch_one(&self.pool)
            .await?;

        let revenue_statuses: Vec<&str> = crate::REVENUE_STATUSES
            .iter()
            .map(|s| s.as_str())
            .collect();
        let revenue: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(total_cents) FROM orders WHERE status = ANY($1)",
        )
        .bind(&revenue_statuses)
        .fetch_one(&self.pool)
        .await?;

        let status_rows =
            sqlx::query("SELECT status, COUNT(*) AS count FROM orders GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut orders = 0u64;
        let mut orders_by_status = std::collections::HashMap::new();
        for row in status_rows {
            let status: String = row.try_get("status")?;
            let count: i64 = row.try_get("count")?;
            orders += count as u64;
            orders_by_status.insert(status, count as u64);
        }

        Ok(StoreStats {
            users: users as u64,
            books: books as u64,
            orders,
            reviews: reviews as u64,
            revenue_cents: revenue.unwrap_or(0),
            orders_by_status,
        })
    }
}
