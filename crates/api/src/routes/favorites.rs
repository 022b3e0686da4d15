//! Favorite book endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{FavoriteId, Isbn};
use domain::Favorite;
use serde::Deserialize;
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::routes::{parse_user_id, parse_uuid_id};

#[derive(Debug, Deserialize)]
pub struct ListFavoritesQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateFavoriteRequest {
    pub user_id: String,
    pub isbn: String,
}

/// GET /favoris?user_id= — list the user's favorites.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListFavoritesQuery>,
) -> Result<Json<Vec<Favorite>>, ApiError> {
    let user_id = parse_user_id(&query.user_id)?;
    Ok(Json(state.store.list_favorites_for_user(user_id).await?))
}

/// POST /favoris — bookmark a book. Duplicate pairs are a conflict.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateFavoriteRequest>,
) -> Result<(StatusCode, Json<Favorite>), ApiError> {
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

    let favorite = Favorite::new(user_id, isbn);
    state.store.insert_favorite(&favorite).await?;

    Ok((StatusCode::CREATED, Json(favorite)))
}

/// DELETE /favoris/:id — remove a bookmark.
#[tracing::instrument(skip(state))]
pub async fn remove<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let favorite_id = parse_uuid_id::<FavoriteId>(&id)?;
    state
        .store
        .delete_favorite(favorite_id)
        .await
        .map_err(|e| match e {
            store::StoreError::NotFound => ApiError::NotFound(format!("favorite {id} not found")),
            other => other.into(),
        })?;
    Ok(StatusCode::NO_CONTENT)
}
