//! Catalog endpoints for books.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{NaiveDate, Utc};
use common::Isbn;
use domain::{Book, Money};
use serde::Deserialize;
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::routes::parse_uuid_id;

#[derive(Debug, Deserialize)]
pub struct ListBooksQuery {
    pub categorie: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookRequest {
    pub isbn: String,
    pub title: String,
    pub price_cents: i64,
    pub stock: Option<u32>,
    pub synopsis: Option<String>,
    pub category: Option<String>,
    pub published_on: Option<NaiveDate>,
    pub author_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub price_cents: Option<i64>,
    pub stock: Option<u32>,
    pub synopsis: Option<String>,
    pub category: Option<String>,
    pub published_on: Option<NaiveDate>,
    pub author_id: Option<String>,
}

/// GET /ouvrages — list books, optionally filtered by category.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListBooksQuery>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let books = state.store.list_books(query.categorie.as_deref()).await?;
    Ok(Json(books))
}

/// GET /ouvrages/:isbn — fetch one book.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(isbn): Path<String>,
) -> Result<Json<Book>, ApiError> {
    let book = state
        .store
        .get_book(&Isbn::from(isbn.clone()))
        .await
        .map_err(|e| match e {
            store::StoreError::NotFound => ApiError::NotFound(format!("book {isbn} not found")),
            other => other.into(),
        })?;
    Ok(Json(book))
}

/// POST /ouvrages — create a book.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateBookRequest>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let mut book = Book::new(req.isbn, req.title, Money::from_cents(req.price_cents))?;
    if let Some(stock) = req.stock {
        book.stock = stock;
    }
    if let Some(category) = req.category {
        book.category = category;
    }
    book.synopsis = req.synopsis;
    book.published_on = req.published_on;
    if let Some(ref author_id) = req.author_id {
        let author_id = parse_uuid_id(author_id)?;
        // The author must exist before a book can reference it.
        state.store.get_author(author_id).await.map_err(|_| {
            ApiError::BadRequest(format!("unknown author {author_id}"))
        })?;
        book.author_id = Some(author_id);
    }
    book.check()?;

    state.store.insert_book(&book).await?;
    metrics::counter!("books_created_total").increment(1);

    Ok((StatusCode::CREATED, Json(book)))
}

/// PUT /ouvrages/:isbn — partial update of a book.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(isbn): Path<String>,
    Json(req): Json<UpdateBookRequest>,
) -> Result<Json<Book>, ApiError> {
    let isbn = Isbn::from(isbn);
    let mut book = state.store.get_book(&isbn).await.map_err(|e| match e {
        store::StoreError::NotFound => ApiError::NotFound(format!("book {isbn} not found")),
        other => other.into(),
    })?;

    if let Some(title) = req.title {
        book.title = title;
    }
    if let Some(cents) = req.price_cents {
        book.price = Money::from_cents(cents);
    }
    if let Some(stock) = req.stock {
        book.stock = stock;
    }
    if let Some(synopsis) = req.synopsis {
        book.synopsis = Some(synopsis);
    }
    if let Some(category) = req.category {
        book.category = category;
    }
    if let Some(published_on) = req.published_on {
        book.published_on = Some(published_on);
    }
    if let Some(ref author_id) = req.author_id {
        let author_id = parse_uuid_id(author_id)?;
        state.store.get_author(author_id).await.map_err(|_| {
            ApiError::BadRequest(format!("unknown author {author_id}"))
        })?;
        book.author_id = Some(author_id);
    }
    book.updated_at = Utc::now();
    book.check()?;

    state.store.update_book(&book).await?;
    Ok(Json(book))
}

/// DELETE /ouvrages/:isbn — delete a book.
#[tracing::instrument(skip(state))]
pub async fn remove<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(isbn): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .delete_book(&Isbn::from(isbn.clone()))
        .await
        .map_err(|e| match e {
            store::StoreError::NotFound => ApiError::NotFound(format!("book {isbn} not found")),
            other => other.into(),
        })?;
    Ok(StatusCode::NO_CONTENT)
}
