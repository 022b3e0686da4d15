//! Order aggregate and related types.

mod aggregate;
mod payment;
mod status;
mod value_objects;

pub use aggregate::{CheckoutOrder, Order};
pub use payment::{CardDetails, PaymentOutcome, process_payment};
pub use status::{ItemMix, OrderStatus};
pub use value_objects::{GuestContact, ItemFormat, Money, OrderLine, ShippingAddress};

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The requested status is not reachable from the current one.
    #[error("illegal transition: {from} -> {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    /// The order has no line items.
    #[error("order has no items")]
    NoItems,

    /// An order must be owned by exactly one of: a registered user or an
    /// inline guest block.
    #[error("order requires exactly one owner: a registered user or a guest block")]
    AmbiguousOwner,

    /// Line items can only be replaced while the order is still a cart.
    #[error("line items are frozen once the order leaves the cart state (status: {status})")]
    LinesLocked { status: OrderStatus },

    /// Invalid line quantity.
    #[error("invalid quantity: {quantity} (must be at least 1)")]
    InvalidQuantity { quantity: u32 },

    /// Invalid line unit price.
    #[error("invalid unit price: {cents} cents (must not be negative)")]
    InvalidPrice { cents: i64 },

    /// Invalid shipping cost.
    #[error("invalid shipping cost: {cents} cents (must not be negative)")]
    InvalidShippingCost { cents: i64 },

    /// Shipping address failed validation.
    #[error("invalid shipping address: {0}")]
    InvalidAddress(String),

    /// Guest contact block failed validation.
    #[error("invalid guest contact: {0}")]
    InvalidGuest(String),

    /// Card details are missing or malformed.
    #[error("invalid card details: {0}")]
    InvalidCard(String),

    /// The claimed payment amount does not match the order total.
    #[error(
        "claimed amount {claimed_cents} cents does not match order total {total_cents} cents"
    )]
    AmountMismatch { claimed_cents: i64, total_cents: i64 },
}
