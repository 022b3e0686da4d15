//! Catalog endpoints for authors.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::Author;
use serde::Deserialize;
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::routes::parse_uuid_id;

#[derive(Deserialize)]
pub struct CreateAuthorRequest {
    pub last_name: String,
    pub first_name: Option<String>,
    pub biography: Option<String>,
}

/// GET /auteurs — list all authors.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Author>>, ApiError> {
    Ok(Json(state.store.list_authors().await?))
}

/// GET /auteurs/:id — fetch one author.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Author>, ApiError> {
    let author_id = parse_uuid_id(&id)?;
    let author = state.store.get_author(author_id).await.map_err(|e| match e {
        store::StoreError::NotFound => ApiError::NotFound(format!("author {id} not found")),
        other => other.into(),
    })?;
    Ok(Json(author))
}

/// POST /auteurs — create an author.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateAuthorRequest>,
) -> Result<(StatusCode, Json<Author>), ApiError> {
    let mut author = Author::new(req.last_name)?;
    author.first_name = req.first_name;
    author.biography = req.biography;

    state.store.insert_author(&author).await?;
    Ok((StatusCode::CREATED, Json(author)))
}
