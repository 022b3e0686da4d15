//! Value objects for the order domain.

use common::Isbn;
use serde::{Deserialize, Serialize};

use crate::validate;

use super::OrderError;

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = 10.00 €).
    cents: i64,
}

impl Money {
    /// Creates a new amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents * quantity as i64,
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.abs();
        write!(f, "{sign}{}.{:02} €", abs / 100, abs % 100)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents - rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// Fulfillment format of a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemFormat {
    /// New paper copy, shipped.
    PaperNew,
    /// Second-hand paper copy, shipped.
    PaperUsed,
    /// Digital copy, fulfilled by granting access.
    Ebook,
}

impl ItemFormat {
    /// Returns true if the line is fulfilled by shipping a physical book.
    pub fn is_physical(self) -> bool {
        matches!(self, ItemFormat::PaperNew | ItemFormat::PaperUsed)
    }

    /// Returns the format tag as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemFormat::PaperNew => "paper-new",
            ItemFormat::PaperUsed => "paper-used",
            ItemFormat::Ebook => "ebook",
        }
    }

    /// Parses a wire string back into a format tag.
    pub fn parse(s: &str) -> Option<ItemFormat> {
        match s {
            "paper-new" => Some(ItemFormat::PaperNew),
            "paper-used" => Some(ItemFormat::PaperUsed),
            "ebook" => Some(ItemFormat::Ebook),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A line item owned by an order.
///
/// Title and unit price are snapshots taken when the line is created, so
/// later catalog edits do not rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Catalog code of the book.
    pub isbn: Isbn,

    /// Title snapshot.
    pub title: String,

    /// Fulfillment format.
    pub format: ItemFormat,

    /// Quantity ordered.
    pub quantity: u32,

    /// Price per unit at the time the line was created.
    pub unit_price: Money,
}

impl OrderLine {
    /// Creates a new order line.
    pub fn new(
        isbn: impl Into<Isbn>,
        title: impl Into<String>,
        format: ItemFormat,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            isbn: isbn.into(),
            title: title.into(),
            format,
            quantity,
            unit_price,
        }
    }

    /// Returns the total price for this line (quantity × unit price).
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }

    /// Checks quantity and price bounds.
    pub fn check(&self) -> Result<(), OrderError> {
        if self.quantity < 1 {
            return Err(OrderError::InvalidQuantity {
                quantity: self.quantity,
            });
        }
        if self.unit_price.is_negative() {
            return Err(OrderError::InvalidPrice {
                cents: self.unit_price.cents(),
            });
        }
        Ok(())
    }
}

/// Shipping address attached to a checkout order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    /// Five ASCII digits.
    pub postal_code: String,
    /// Defaults to "France" on the wire.
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "France".to_string()
}

impl ShippingAddress {
    /// Checks that the address is complete and the postal code well-formed.
    pub fn check(&self) -> Result<(), OrderError> {
        if self.street.trim().is_empty() {
            return Err(OrderError::InvalidAddress("street is required".into()));
        }
        if self.city.trim().is_empty() {
            return Err(OrderError::InvalidAddress("city is required".into()));
        }
        validate::postal_code(&self.postal_code)
            .map_err(|e| OrderError::InvalidAddress(e.to_string()))?;
        Ok(())
    }
}

/// Inline contact block for an order placed without a registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestContact {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl GuestContact {
    /// Checks email format, name presence, and phone format when given.
    pub fn check(&self) -> Result<(), OrderError> {
        validate::email(&self.email).map_err(|e| OrderError::InvalidGuest(e.to_string()))?;
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(OrderError::InvalidGuest("name is required".into()));
        }
        if let Some(phone) = &self.phone {
            validate::phone(phone).map_err(|e| OrderError::InvalidGuest(e.to_string()))?;
        }
        Ok(())
    }
}
