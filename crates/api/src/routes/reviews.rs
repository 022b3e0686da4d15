//! Book review endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{Isbn, ReviewId};
use domain::Review;
use serde::Deserialize;
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::routes::{parse_user_id, parse_uuid_id};

#[derive(Deserialize)]
pub struct UpsertReviewRequest {
    pub user_id: String,
    pub isbn: String,
    pub rating: i16,
    pub comment: Option<String>,
}

/// GET /avis/:isbn — list all reviews for a book.
#[tracing::instrument(skip(state))]
pub async fn list_for_book<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(isbn): Path<String>,
) -> Result<Json<Vec<Review>>, ApiError> {
    let reviews = state
        .store
        .list_reviews_for_book(&Isbn::from(isbn))
        .await?;
    Ok(Json(reviews))
}

/// POST /avis — write or replace the user's review of a book.
#[tracing::instrument(skip(state, req))]
pub async fn upsert<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<UpsertReviewRequest>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    let user_id = parse_user_id(&req.user_id)?;
    state
        .store
        .get_user(user_id)
        .await
        .map_err(|_| ApiError::BadRequest(format!("unknown user {}", req.user_id)))?;

    let isbn = Isbn::from(req.isbn.clone());
    state.store.get_book(&isbn).await.map_err(|e| match e {
        store::StoreError::NotFound => ApiError::BadRequest(format!("unknown book {}", req.isbn)),
        other => other.into(),
    })?;

    let review = Review::new(user_id, isbn, req.rating, req.comment)?;
    let stored = state.store.upsert_review(&review).await?;

    Ok((StatusCode::CREATED, Json(stored)))
}

/// DELETE /avis/:id — delete one's review.
#[tracing::instrument(skip(state))]
pub async fn remove<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let review_id = parse_uuid_id::<ReviewId>(&id)?;
    state
        .store
        .delete_review(review_id)
        .await
        .map_err(|e| match e {
            store::StoreError::NotFound => ApiError::NotFound(format!("review {id} not found")),
            other => other.into(),
        })?;
    Ok(StatusCode::NO_CONTENT)
}
