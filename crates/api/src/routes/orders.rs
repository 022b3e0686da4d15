//! Checkout, order lookup, payment, and status transitions.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{Isbn, OrderId};
use domain::{
    CardDetails, CheckoutOrder, GuestContact, ItemFormat, Money, Order, OrderLine, OrderStatus,
    PaymentOutcome, ShippingAddress, process_payment,
};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::routes::{parse_user_id, parse_uuid_id};

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct LineRequest {
    pub isbn: String,
    pub format: ItemFormat,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: Option<String>,
    pub guest: Option<GuestContact>,
    pub items: Vec<LineRequest>,
    pub shipping_address: ShippingAddress,
    pub shipping_cost_cents: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub card_number: String,
    pub cvc: String,
    pub amount_cents: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub isbn: String,
    pub title: String,
    pub format: ItemFormat,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub total_cents: i64,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest: Option<GuestContact>,
    pub status: OrderStatus,
    pub items: Vec<OrderLineResponse>,
    pub subtotal_cents: i64,
    pub shipping_cost_cents: i64,
    pub total_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<ShippingAddress>,
    pub allowed_transitions: Vec<OrderStatus>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            user_id: order.user_id().map(|id| id.to_string()),
            guest: order.guest().cloned(),
            status: order.status(),
            items: order.lines().iter().map(line_response).collect(),
            subtotal_cents: order.subtotal().cents(),
            shipping_cost_cents: order.shipping_cost().cents(),
            total_cents: order.total().cents(),
            shipping_address: order.shipping_address().cloned(),
            allowed_transitions: order.allowed_transitions(),
        }
    }
}

pub(crate) fn line_response(line: &OrderLine) -> OrderLineResponse {
    OrderLineResponse {
        isbn: line.isbn.to_string(),
        title: line.title.clone(),
        format: line.format,
        quantity: line.quantity,
        unit_price_cents: line.unit_price.cents(),
        total_cents: line.total_price().cents(),
    }
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub outcome: PaymentOutcome,
    pub status: OrderStatus,
    pub total_cents: i64,
}

/// Resolves requested line items against the catalog.
///
/// Title and unit price are snapshotted from the current catalog entry;
/// the client never supplies prices.
pub(crate) async fn resolve_lines<S: Store>(
    state: &AppState<S>,
    items: &[LineRequest],
) -> Result<Vec<OrderLine>, ApiError> {
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let isbn = Isbn::from(item.isbn.clone());
        let book = state.store.get_book(&isbn).await.map_err(|e| match e {
            store::StoreError::NotFound => {
                ApiError::BadRequest(format!("unknown book {}", item.isbn))
            }
            other => other.into(),
        })?;
        lines.push(OrderLine::new(
            isbn,
            book.title,
            item.format,
            item.quantity,
            book.price,
        ));
    }
    Ok(lines)
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    parse_uuid_id::<OrderId>(id)
}

async fn load_order<S: Store>(state: &AppState<S>, id: &str) -> Result<Order, ApiError> {
    let order_id = parse_order_id(id)?;
    state.store.get_order(order_id).await.map_err(|e| match e {
        store::StoreError::NotFound => ApiError::NotFound(format!("order {id} not found")),
        other => other.into(),
    })
}

// -- Handlers --

/// POST /commandes — create a checkout order in `payment-pending`.
///
/// The cart is left untouched; clients clear it separately once the
/// checkout went through.
#[tracing::instrument(skip(state, req))]
pub async fn checkout<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let user_id = match &req.user_id {
        Some(id) => {
            let user_id = parse_user_id(id)?;
            // A registered owner must actually exist.
            state
                .store
                .get_user(user_id)
                .await
                .map_err(|_| ApiError::BadRequest(format!("unknown user {id}")))?;
            Some(user_id)
        }
        None => None,
    };

    let lines = resolve_lines(&state, &req.items).await?;
    let order = Order::checkout(CheckoutOrder {
        user_id,
        guest: req.guest,
        lines,
        shipping_address: req.shipping_address,
        shipping_cost: Money::from_cents(req.shipping_cost_cents.unwrap_or(0)),
    })?;

    state.store.insert_order(&order).await?;
    metrics::counter!("orders_checked_out_total").increment(1);

    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /commandes — list orders, optionally for one user.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = match &query.user_id {
        Some(id) => state.store.list_orders_for_user(parse_user_id(id)?).await?,
        None => state.store.list_orders().await?,
    };
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /commandes/:id — fetch one order.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = load_order(&state, &id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /commandes/:id/paiement — run the simulated payment.
///
/// A decline is a 200 response with a `declined` outcome, not an error.
#[tracing::instrument(skip(state, req))]
pub async fn pay<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let mut order = load_order(&state, &id).await?;

    let card = CardDetails {
        number: req.card_number,
        cvc: req.cvc,
        claimed_amount: req.amount_cents.map(Money::from_cents),
    };
    let outcome = process_payment(&mut order, &card)?;

    state.store.update_order(&order).await?;
    match outcome {
        PaymentOutcome::Approved => {
            metrics::counter!("payments_approved_total").increment(1);
        }
        PaymentOutcome::Declined => {
            metrics::counter!("payments_declined_total").increment(1);
        }
    }

    Ok(Json(PaymentResponse {
        outcome,
        status: order.status(),
        total_cents: order.total().cents(),
    }))
}

/// PATCH /commandes/:id/status — move an order through its state machine.
#[tracing::instrument(skip(state, req))]
pub async fn set_status<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let target = OrderStatus::parse(&req.status)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown status {:?}", req.status)))?;

    let mut order = load_order(&state, &id).await?;
    order.transition_to(target)?;
    state.store.update_order(&order).await?;

    Ok(Json(OrderResponse::from(&order)))
}
