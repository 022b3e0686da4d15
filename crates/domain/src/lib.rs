//! Domain model for the bookstore backend.
//!
//! Pure business logic with no I/O: the order aggregate and its status
//! state machine, the payment simulation, and the catalog, user, review
//! and favorite entities with their validation rules. Persistence and
//! HTTP concerns live in the `store` and `api` crates.

pub mod catalog;
pub mod order;
pub mod review;
pub mod user;
pub mod validate;

mod error;

pub use catalog::{Author, Book};
pub use error::DomainError;
pub use order::{
    CardDetails, CheckoutOrder, GuestContact, ItemFormat, ItemMix, Money, Order, OrderError,
    OrderLine, OrderStatus, PaymentOutcome, ShippingAddress, process_payment,
};
pub use review::{Favorite, Review};
pub use user::{Role, User};
