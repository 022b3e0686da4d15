//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};

use super::{
    GuestContact, ItemMix, Money, OrderError, OrderLine, OrderStatus, ShippingAddress,
};

/// Order aggregate root.
///
/// An order and its owned line items form one consistency unit: totals are
/// always recomputed from the lines, and the status field only moves
/// through [`Order::transition_to`], which consults the state machine.
///
/// The same type backs the persistent shopping cart (status `cart`, no
/// shipping information) and real checkout orders.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    id: OrderId,
    user_id: Option<UserId>,
    guest: Option<GuestContact>,
    status: OrderStatus,
    lines: Vec<OrderLine>,
    shipping_cost: Money,
    shipping_address: Option<ShippingAddress>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Input for creating a checkout order.
///
/// Exactly one of `user_id` and `guest` must be present.
#[derive(Debug, Clone)]
pub struct CheckoutOrder {
    pub user_id: Option<UserId>,
    pub guest: Option<GuestContact>,
    pub lines: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
    pub shipping_cost: Money,
}

impl Order {
    /// Creates an empty cart order for a registered user.
    pub fn new_cart(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            user_id: Some(user_id),
            guest: None,
            status: OrderStatus::Cart,
            lines: Vec::new(),
            shipping_cost: Money::zero(),
            shipping_address: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a checkout order directly in `payment-pending`.
    ///
    /// Validates owner exclusivity, line items, the shipping address, and
    /// the guest block when present. Totals are computed from the lines;
    /// nothing is trusted from the caller beyond the raw line data.
    pub fn checkout(input: CheckoutOrder) -> Result<Self, OrderError> {
        match (&input.user_id, &input.guest) {
            (Some(_), None) | (None, Some(_)) => {}
            _ => return Err(OrderError::AmbiguousOwner),
        }

        if input.lines.is_empty() {
            return Err(OrderError::NoItems);
        }
        for line in &input.lines {
            line.check()?;
        }
        input.shipping_address.check()?;
        if let Some(guest) = &input.guest {
            guest.check()?;
        }
        if input.shipping_cost.is_negative() {
            return Err(OrderError::InvalidShippingCost {
                cents: input.shipping_cost.cents(),
            });
        }

        let now = Utc::now();
        Ok(Self {
            id: OrderId::new(),
            user_id: input.user_id,
            guest: input.guest,
            status: OrderStatus::PaymentPending,
            lines: input.lines,
            shipping_cost: input.shipping_cost,
            shipping_address: Some(input.shipping_address),
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuilds an order from stored state. Intended for store
    /// implementations; performs no validation.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: OrderId,
        user_id: Option<UserId>,
        guest: Option<GuestContact>,
        status: OrderStatus,
        lines: Vec<OrderLine>,
        shipping_cost: Money,
        shipping_address: Option<ShippingAddress>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            guest,
            status,
            lines,
            shipping_cost,
            shipping_address,
            created_at,
            updated_at,
        }
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn guest(&self) -> Option<&GuestContact> {
        self.guest.as_ref()
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn shipping_cost(&self) -> Money {
        self.shipping_cost
    }

    pub fn shipping_address(&self) -> Option<&ShippingAddress> {
        self.shipping_address.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Sum of line price × quantity, recomputed on every call.
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(OrderLine::total_price).sum()
    }

    /// Subtotal plus shipping cost.
    pub fn total(&self) -> Money {
        self.subtotal() + self.shipping_cost
    }

    /// Derived physical/digital flags for the state machine.
    pub fn item_mix(&self) -> ItemMix {
        ItemMix {
            has_physical: self.lines.iter().any(|l| l.format.is_physical()),
            has_digital: self.lines.iter().any(|l| !l.format.is_physical()),
        }
    }

    /// Returns the statuses reachable from the current one.
    pub fn allowed_transitions(&self) -> Vec<OrderStatus> {
        self.status.allowed_transitions(self.item_mix())
    }

    /// Returns true if the order may move to `target`.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        self.status.can_transition_to(target, self.item_mix())
    }
}

// Mutation methods
impl Order {
    /// Wholesale-replaces the cart's line items.
    ///
    /// Only valid while the order is still a cart; checkout orders carry
    /// immutable snapshots.
    pub fn replace_lines(&mut self, lines: Vec<OrderLine>) -> Result<(), OrderError> {
        if self.status != OrderStatus::Cart {
            return Err(OrderError::LinesLocked {
                status: self.status,
            });
        }
        for line in &lines {
            line.check()?;
        }
        self.lines = lines;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Moves the order to `target` if the state machine allows it.
    ///
    /// On failure the status is left untouched and the error carries the
    /// attempted `(from, to)` pair.
    pub fn transition_to(&mut self, target: OrderStatus) -> Result<(), OrderError> {
        if !self.can_transition_to(target) {
            return Err(OrderError::IllegalTransition {
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::ItemFormat;

    fn line(isbn: &str, format: ItemFormat, quantity: u32, cents: i64) -> OrderLine {
        OrderLine::new(isbn, "Un livre", format, quantity, Money::from_cents(cents))
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            street: "12 rue des Lilas".into(),
            city: "Lyon".into(),
            postal_code: "69003".into(),
            country: "France".into(),
        }
    }

    fn checkout_input(lines: Vec<OrderLine>) -> CheckoutOrder {
        CheckoutOrder {
            user_id: Some(UserId::new()),
            guest: None,
            lines,
            shipping_address: address(),
            shipping_cost: Money::zero(),
        }
    }

    #[test]
    fn new_cart_is_empty() {
        let user_id = UserId::new();
        let cart = Order::new_cart(user_id);
        assert_eq!(cart.status(), OrderStatus::Cart);
        assert_eq!(cart.user_id(), Some(user_id));
        assert!(cart.lines().is_empty());
        assert!(cart.subtotal().is_zero());
        assert!(cart.shipping_address().is_none());
    }

    #[test]
    fn cart_subtotal_recomputed_after_replace() {
        let mut cart = Order::new_cart(UserId::new());
        cart.replace_lines(vec![
            line("978-1", ItemFormat::PaperNew, 2, 1000),
            line("978-2", ItemFormat::Ebook, 1, 500),
        ])
        .unwrap();

        assert_eq!(cart.subtotal().cents(), 2500);
        assert_eq!(cart.total().cents(), 2500);

        cart.replace_lines(vec![line("978-3", ItemFormat::PaperUsed, 1, 700)])
            .unwrap();
        assert_eq!(cart.subtotal().cents(), 700);
    }

    #[test]
    fn replace_lines_rejected_outside_cart() {
        let mut order = Order::checkout(checkout_input(vec![line(
            "978-1",
            ItemFormat::PaperNew,
            1,
            1000,
        )]))
        .unwrap();

        let result = order.replace_lines(vec![line("978-2", ItemFormat::Ebook, 1, 500)]);
        assert!(matches!(result, Err(OrderError::LinesLocked { .. })));
    }

    #[test]
    fn checkout_computes_totals_server_side() {
        let mut input = checkout_input(vec![
            line("978-1", ItemFormat::PaperNew, 2, 1000),
            line("978-2", ItemFormat::PaperNew, 1, 500),
        ]);
        input.shipping_cost = Money::from_cents(300);

        let order = Order::checkout(input).unwrap();
        assert_eq!(order.status(), OrderStatus::PaymentPending);
        assert_eq!(order.subtotal().cents(), 2500);
        assert_eq!(order.total().cents(), 2800);
    }

    #[test]
    fn checkout_requires_items() {
        let result = Order::checkout(checkout_input(vec![]));
        assert!(matches!(result, Err(OrderError::NoItems)));
    }

    #[test]
    fn checkout_requires_exactly_one_owner() {
        let guest = GuestContact {
            email: "guest@example.com".into(),
            first_name: "Jean".into(),
            last_name: "Dupont".into(),
            phone: None,
        };

        let mut both = checkout_input(vec![line("978-1", ItemFormat::Ebook, 1, 500)]);
        both.guest = Some(guest.clone());
        assert!(matches!(
            Order::checkout(both),
            Err(OrderError::AmbiguousOwner)
        ));

        let mut neither = checkout_input(vec![line("978-1", ItemFormat::Ebook, 1, 500)]);
        neither.user_id = None;
        assert!(matches!(
            Order::checkout(neither),
            Err(OrderError::AmbiguousOwner)
        ));

        let mut guest_only = checkout_input(vec![line("978-1", ItemFormat::Ebook, 1, 500)]);
        guest_only.user_id = None;
        guest_only.guest = Some(guest);
        assert!(Order::checkout(guest_only).is_ok());
    }

    #[test]
    fn checkout_validates_address() {
        let mut input = checkout_input(vec![line("978-1", ItemFormat::Ebook, 1, 500)]);
        input.shipping_address.postal_code = "6900".into();
        assert!(matches!(
            Order::checkout(input),
            Err(OrderError::InvalidAddress(_))
        ));
    }

    #[test]
    fn checkout_rejects_negative_shipping() {
        let mut input = checkout_input(vec![line("978-1", ItemFormat::Ebook, 1, 500)]);
        input.shipping_cost = Money::from_cents(-100);
        assert!(matches!(
            Order::checkout(input),
            Err(OrderError::InvalidShippingCost { .. })
        ));
    }

    #[test]
    fn item_mix_derived_from_lines() {
        let mut cart = Order::new_cart(UserId::new());
        assert_eq!(cart.item_mix(), ItemMix::default());

        cart.replace_lines(vec![
            line("978-1", ItemFormat::PaperNew, 1, 1000),
            line("978-2", ItemFormat::Ebook, 1, 500),
        ])
        .unwrap();
        assert_eq!(
            cart.item_mix(),
            ItemMix {
                has_physical: true,
                has_digital: true
            }
        );
    }

    #[test]
    fn illegal_transition_leaves_status_unchanged() {
        let mut cart = Order::new_cart(UserId::new());
        let result = cart.transition_to(OrderStatus::Shipped);

        assert!(matches!(
            result,
            Err(OrderError::IllegalTransition {
                from: OrderStatus::Cart,
                to: OrderStatus::Shipped,
            })
        ));
        assert_eq!(cart.status(), OrderStatus::Cart);
    }

    #[test]
    fn physical_order_lifecycle() {
        let mut order = Order::checkout(checkout_input(vec![line(
            "978-1",
            ItemFormat::PaperNew,
            1,
            1000,
        )]))
        .unwrap();

        order.transition_to(OrderStatus::Paid).unwrap();
        order.transition_to(OrderStatus::Preparing).unwrap();
        order.transition_to(OrderStatus::Shipped).unwrap();
        order.transition_to(OrderStatus::Delivered).unwrap();
        order.transition_to(OrderStatus::ReturnAccepted).unwrap();
        order.transition_to(OrderStatus::Refunded).unwrap();
        assert_eq!(order.status(), OrderStatus::Refunded);
    }

    #[test]
    fn digital_order_cannot_enter_preparation() {
        let mut order = Order::checkout(checkout_input(vec![line(
            "978-1",
            ItemFormat::Ebook,
            1,
            500,
        )]))
        .unwrap();

        order.transition_to(OrderStatus::Paid).unwrap();
        assert!(matches!(
            order.transition_to(OrderStatus::Preparing),
            Err(OrderError::IllegalTransition { .. })
        ));
        order
            .transition_to(OrderStatus::EbookAccessGranted)
            .unwrap();
        assert!(order.allowed_transitions().is_empty());
    }

    #[test]
    fn mixed_order_allows_both_fulfillments() {
        let order = Order::checkout(checkout_input(vec![
            line("978-1", ItemFormat::PaperNew, 1, 1000),
            line("978-2", ItemFormat::Ebook, 1, 500),
        ]))
        .unwrap();

        let mut paid = order.clone();
        paid.transition_to(OrderStatus::Paid).unwrap();
        assert_eq!(
            paid.allowed_transitions(),
            vec![OrderStatus::Preparing, OrderStatus::EbookAccessGranted]
        );
    }

    #[test]
    fn cancelled_order_can_be_refunded() {
        let mut cart = Order::new_cart(UserId::new());
        cart.transition_to(OrderStatus::Cancelled).unwrap();
        cart.transition_to(OrderStatus::Refunded).unwrap();
        assert!(cart.allowed_transitions().is_empty());
    }
}
