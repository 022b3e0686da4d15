//! Simulated payment step driving the order's state transitions.

use serde::{Deserialize, Serialize};

use super::{Money, Order, OrderError, OrderStatus};

/// Maximum accepted gap between a claimed amount and the server-computed
/// total. The server total is authoritative; the claimed amount is only a
/// confirmation check.
pub const AMOUNT_TOLERANCE_CENTS: i64 = 1;

/// Card payload submitted to the payment endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDetails {
    /// Card number, digits only.
    pub number: String,
    /// Card verification code, digits only.
    pub cvc: String,
    /// Amount the client believes it is paying, in cents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_amount: Option<Money>,
}

/// Business outcome of a payment attempt. A decline is a successful call,
/// not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentOutcome {
    Approved,
    Declined,
}

/// Runs the simulated payment gateway against an order.
///
/// Stand-in decision rule: the charge is approved iff the last digit of
/// the card number is even.
///
/// On approval the order moves to `paid`, then immediately attempts the
/// applicable fulfillment transition (`preparing` when physical lines
/// exist, else `ebook-access-granted`). The follow-on is best-effort:
/// `paid` alone is a valid resting state for this call. On decline the
/// order is cancelled, also best-effort.
///
/// Persistence is the caller's responsibility; this function only mutates
/// the in-memory aggregate.
pub fn process_payment(
    order: &mut Order,
    card: &CardDetails,
) -> Result<PaymentOutcome, OrderError> {
    if !order.can_transition_to(OrderStatus::Paid) {
        return Err(OrderError::IllegalTransition {
            from: order.status(),
            to: OrderStatus::Paid,
        });
    }

    if card.number.is_empty() || !card.number.chars().all(|c| c.is_ascii_digit()) {
        return Err(OrderError::InvalidCard(
            "card number must be a non-empty string of digits".into(),
        ));
    }
    if card.cvc.is_empty() || !card.cvc.chars().all(|c| c.is_ascii_digit()) {
        return Err(OrderError::InvalidCard(
            "cvc must be a non-empty string of digits".into(),
        ));
    }

    if let Some(claimed) = card.claimed_amount {
        let total = order.total();
        if (claimed.cents() - total.cents()).abs() > AMOUNT_TOLERANCE_CENTS {
            return Err(OrderError::AmountMismatch {
                claimed_cents: claimed.cents(),
                total_cents: total.cents(),
            });
        }
    }

    let Some(last_digit) = card.number.chars().last().and_then(|c| c.to_digit(10)) else {
        return Err(OrderError::InvalidCard("card number is empty".into()));
    };

    if last_digit % 2 == 0 {
        order.transition_to(OrderStatus::Paid)?;

        let mix = order.item_mix();
        let follow_on = if mix.has_physical {
            Some(OrderStatus::Preparing)
        } else if mix.has_digital {
            Some(OrderStatus::EbookAccessGranted)
        } else {
            None
        };
        if let Some(target) = follow_on {
            // Best-effort: paid is already a valid outcome of this call.
            let _ = order.transition_to(target);
        }

        Ok(PaymentOutcome::Approved)
    } else {
        // Best-effort cancellation on decline.
        let _ = order.transition_to(OrderStatus::Cancelled);
        Ok(PaymentOutcome::Declined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{CheckoutOrder, ItemFormat, OrderLine, ShippingAddress};
    use common::UserId;

    fn order_with(lines: Vec<OrderLine>) -> Order {
        Order::checkout(CheckoutOrder {
            user_id: Some(UserId::new()),
            guest: None,
            lines,
            shipping_address: ShippingAddress {
                street: "12 rue des Lilas".into(),
                city: "Lyon".into(),
                postal_code: "69003".into(),
                country: "France".into(),
            },
            shipping_cost: Money::from_cents(300),
        })
        .unwrap()
    }

    fn physical_order() -> Order {
        order_with(vec![OrderLine::new(
            "978-1",
            "Un livre",
            ItemFormat::PaperNew,
            2,
            Money::from_cents(1000),
        )])
    }

    fn digital_order() -> Order {
        order_with(vec![OrderLine::new(
            "978-2",
            "Un ebook",
            ItemFormat::Ebook,
            1,
            Money::from_cents(500),
        )])
    }

    fn card(number: &str) -> CardDetails {
        CardDetails {
            number: number.into(),
            cvc: "123".into(),
            claimed_amount: None,
        }
    }

    #[test]
    fn even_last_digit_approves_and_advances_to_preparing() {
        let mut order = physical_order();
        let outcome = process_payment(&mut order, &card("4970100000000154")).unwrap();
        assert_eq!(outcome, PaymentOutcome::Approved);
        assert_eq!(order.status(), OrderStatus::Preparing);
    }

    #[test]
    fn digital_only_order_advances_to_ebook_access() {
        let mut order = digital_order();
        let outcome = process_payment(&mut order, &card("4970100000000154")).unwrap();
        assert_eq!(outcome, PaymentOutcome::Approved);
        assert_eq!(order.status(), OrderStatus::EbookAccessGranted);
    }

    #[test]
    fn mixed_order_prefers_preparing() {
        let mut order = order_with(vec![
            OrderLine::new("978-1", "Papier", ItemFormat::PaperUsed, 1, Money::from_cents(700)),
            OrderLine::new("978-2", "Ebook", ItemFormat::Ebook, 1, Money::from_cents(500)),
        ]);
        process_payment(&mut order, &card("4970100000000154")).unwrap();
        assert_eq!(order.status(), OrderStatus::Preparing);
    }

    #[test]
    fn odd_last_digit_declines_and_cancels() {
        let mut order = physical_order();
        let outcome = process_payment(&mut order, &card("4970100000000153")).unwrap();
        assert_eq!(outcome, PaymentOutcome::Declined);
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }

    #[test]
    fn payment_requires_reachable_paid_state() {
        let mut cart = Order::new_cart(UserId::new());
        let result = process_payment(&mut cart, &card("4970100000000154"));
        assert!(matches!(
            result,
            Err(OrderError::IllegalTransition {
                from: OrderStatus::Cart,
                to: OrderStatus::Paid,
            })
        ));
        assert_eq!(cart.status(), OrderStatus::Cart);
    }

    #[test]
    fn malformed_card_is_rejected_without_mutation() {
        let mut order = physical_order();
        assert!(matches!(
            process_payment(&mut order, &card("4242-4242")),
            Err(OrderError::InvalidCard(_))
        ));

        let mut no_cvc = card("4970100000000154");
        no_cvc.cvc = String::new();
        assert!(matches!(
            process_payment(&mut order, &no_cvc),
            Err(OrderError::InvalidCard(_))
        ));
        assert_eq!(order.status(), OrderStatus::PaymentPending);
    }

    #[test]
    fn claimed_amount_checked_within_one_cent() {
        // total = 2 * 1000 + 300 shipping = 2300
        let mut order = physical_order();
        let mut exact = card("4970100000000154");
        exact.claimed_amount = Some(Money::from_cents(2300));
        assert!(process_payment(&mut order, &exact).is_ok());

        let mut order = physical_order();
        let mut close = card("4970100000000154");
        close.claimed_amount = Some(Money::from_cents(2301));
        assert!(process_payment(&mut order, &close).is_ok());

        let mut order = physical_order();
        let mut off = card("4970100000000154");
        off.claimed_amount = Some(Money::from_cents(2302));
        assert!(matches!(
            process_payment(&mut order, &off),
            Err(OrderError::AmountMismatch {
                claimed_cents: 2302,
                total_cents: 2300,
            })
        ));
        assert_eq!(order.status(), OrderStatus::PaymentPending);
    }
}
