//! Persistent shopping cart endpoints.
//!
//! The cart is an order in status `cart`; at most one per user. Saving
//! wholesale-replaces the line items, so the client always sends the
//! complete cart.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use common::UserId;
use domain::Order;
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::routes::orders::{LineRequest, OrderLineResponse, line_response, resolve_lines};
use crate::routes::parse_user_id;

#[derive(Debug, Deserialize)]
pub struct CartQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveCartRequest {
    pub user_id: String,
    pub items: Vec<LineRequest>,
}

#[derive(Serialize)]
pub struct CartResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub items: Vec<OrderLineResponse>,
    pub subtotal_cents: i64,
    pub total_cents: i64,
}

impl CartResponse {
    fn empty() -> Self {
        Self {
            order_id: None,
            items: Vec::new(),
            subtotal_cents: 0,
            total_cents: 0,
        }
    }

    fn from_order(order: &Order) -> Self {
        Self {
            order_id: Some(order.id().to_string()),
            items: order.lines().iter().map(line_response).collect(),
            subtotal_cents: order.subtotal().cents(),
            total_cents: order.total().cents(),
        }
    }
}

async fn user_must_exist<S: Store>(state: &AppState<S>, id: &str) -> Result<UserId, ApiError> {
    let user_id = parse_user_id(id)?;
    state
        .store
        .get_user(user_id)
        .await
        .map_err(|_| ApiError::NotFound(format!("user {id} not found")))?;
    Ok(user_id)
}

/// GET /panier?user_id= — fetch the user's cart.
///
/// A user without a cart gets an empty payload, not a 404.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<CartQuery>,
) -> Result<Json<CartResponse>, ApiError> {
    let user_id = user_must_exist(&state, &query.user_id).await?;

    let response = match state.store.cart_for_user(user_id).await? {
        Some(cart) => CartResponse::from_order(&cart),
        None => CartResponse::empty(),
    };
    Ok(Json(response))
}

/// POST /panier — create or wholesale-replace the cart's contents.
#[tracing::instrument(skip(state, req))]
pub async fn save<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<SaveCartRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let user_id = user_must_exist(&state, &req.user_id).await?;
    let lines = resolve_lines(&state, &req.items).await?;

    match state.store.cart_for_user(user_id).await? {
        Some(mut cart) => {
            cart.replace_lines(lines)?;
            state.store.update_order(&cart).await?;
            Ok(Json(CartResponse::from_order(&cart)))
        }
        None => {
            let mut cart = Order::new_cart(user_id);
            cart.replace_lines(lines)?;
            state.store.insert_order(&cart).await?;
            Ok(Json(CartResponse::from_order(&cart)))
        }
    }
}

/// DELETE /panier?user_id= — drop the cart and its lines.
#[tracing::instrument(skip(state))]
pub async fn clear<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<CartQuery>,
) -> Result<StatusCode, ApiError> {
    let user_id = user_must_exist(&state, &query.user_id).await?;

    if let Some(cart) = state.store.cart_for_user(user_id).await? {
        state.store.delete_order(cart.id()).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}
