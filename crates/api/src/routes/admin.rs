//! Admin dashboard endpoints, guarded by the `X-User-Id` identity header.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::Utc;
use common::ReviewId;
use domain::{Role, User};
use serde::Deserialize;
use store::{Store, StoreStats};

use crate::AppState;
use crate::auth::require_admin;
use crate::error::ApiError;
use crate::routes::{parse_user_id, parse_uuid_id};

#[derive(Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

/// GET /admin/stats — entity counts, revenue, and orders by status.
#[tracing::instrument(skip(state, headers))]
pub async fn stats<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<StoreStats>, ApiError> {
    require_admin(&state.store, &headers).await?;
    Ok(Json(state.store.stats().await?))
}

/// GET /admin/utilisateurs — list all accounts.
#[tracing::instrument(skip(state, headers))]
pub async fn list_users<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<User>>, ApiError> {
    require_admin(&state.store, &headers).await?;
    Ok(Json(state.store.list_users().await?))
}

/// PUT /admin/utilisateurs/:id/role — change a user's role.
#[tracing::instrument(skip(state, headers, req))]
pub async fn set_role<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SetRoleRequest>,
) -> Result<Json<User>, ApiError> {
    require_admin(&state.store, &headers).await?;

    let role = Role::parse(&req.role)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown role {:?}", req.role)))?;

    let user_id = parse_user_id(&id)?;
    let mut user = state.store.get_user(user_id).await.map_err(|e| match e {
        store::StoreError::NotFound => ApiError::NotFound(format!("user {id} not found")),
        other => other.into(),
    })?;

    user.role = role;
    user.updated_at = Utc::now();
    state.store.update_user(&user).await?;

    Ok(Json(user))
}

/// DELETE /admin/utilisateurs/:id — delete an account.
#[tracing::instrument(skip(state, headers))]
pub async fn remove_user<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    require_admin(&state.store, &headers).await?;

    let user_id = parse_user_id(&id)?;
    state.store.delete_user(user_id).await.map_err(|e| match e {
        store::StoreError::NotFound => ApiError::NotFound(format!("user {id} not found")),
        other => other.into(),
    })?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /admin/avis/:id — moderate away a review.
#[tracing::instrument(skip(state, headers))]
pub async fn remove_review<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    require_admin(&state.store, &headers).await?;

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
