//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// cart ──► validated ──► payment-pending ──► paid ──┬──► preparing ──► shipped ──► delivered ──► return-accepted ──► refunded
///   │          │                │                   │
///   │          │                │                   └──► ebook-access-granted
///   └──────────┴────────────────┴──► cancelled ──► refunded
/// ```
///
/// The two edges out of `paid` are conditional on the order's line items:
/// `preparing` requires at least one physical line, `ebook-access-granted`
/// at least one digital line. A mixed order allows both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    /// Persistent shopping cart; at most one per user.
    #[default]
    Cart,

    /// Cart contents confirmed by the user.
    Validated,

    /// Checkout completed, awaiting payment.
    PaymentPending,

    /// Payment accepted.
    Paid,

    /// Physical items being prepared for shipment.
    Preparing,

    /// Parcel handed to the carrier.
    Shipped,

    /// Parcel received by the customer.
    Delivered,

    /// Digital access opened (terminal state).
    EbookAccessGranted,

    /// Return request accepted.
    ReturnAccepted,

    /// Order cancelled.
    Cancelled,

    /// Payment refunded (terminal state).
    Refunded,
}

/// Derived line-item context for the conditional edges out of `paid`.
///
/// Computed from the order's lines at query time, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemMix {
    /// The order contains at least one `paper-new` or `paper-used` line.
    pub has_physical: bool,
    /// The order contains at least one digital line.
    pub has_digital: bool,
}

impl OrderStatus {
    /// Returns the set of statuses reachable from this one.
    ///
    /// Pure function of the current status and the derived item mix; the
    /// mix only matters for the conditional edges out of `paid`.
    pub fn allowed_transitions(self, mix: ItemMix) -> Vec<OrderStatus> {
        use OrderStatus::*;

        match self {
            Cart => vec![Validated, Cancelled],
            Validated => vec![PaymentPending, Cancelled],
            PaymentPending => vec![Paid, Cancelled],
            Paid => {
                let mut allowed = Vec::new();
                if mix.has_physical {
                    allowed.push(Preparing);
                }
                if mix.has_digital {
                    allowed.push(EbookAccessGranted);
                }
                allowed
            }
            Preparing => vec![Shipped, Cancelled],
            Shipped => vec![Delivered],
            Delivered => vec![ReturnAccepted],
            EbookAccessGranted => vec![],
            ReturnAccepted => vec![Refunded],
            Cancelled => vec![Refunded],
            Refunded => vec![],
        }
    }

    /// Returns true if `target` is reachable from this status.
    pub fn can_transition_to(self, target: OrderStatus, mix: ItemMix) -> bool {
        self.allowed_transitions(mix).contains(&target)
    }

    /// Returns the status name as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Cart => "cart",
            OrderStatus::Validated => "validated",
            OrderStatus::PaymentPending => "payment-pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::EbookAccessGranted => "ebook-access-granted",
            OrderStatus::ReturnAccepted => "return-accepted",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Parses a wire string back into a status.
    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s {
            "cart" => Some(OrderStatus::Cart),
            "validated" => Some(OrderStatus::Validated),
            "payment-pending" => Some(OrderStatus::PaymentPending),
            "paid" => Some(OrderStatus::Paid),
            "preparing" => Some(OrderStatus::Preparing),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "ebook-access-granted" => Some(OrderStatus::EbookAccessGranted),
            "return-accepted" => Some(OrderStatus::ReturnAccepted),
            "cancelled" => Some(OrderStatus::Cancelled),
            "refunded" => Some(OrderStatus::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
