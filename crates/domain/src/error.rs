//! Domain error types.

use thiserror::Error;

use crate::order::OrderError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error raised by the order aggregate or payment flow.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// A field failed validation; the request must be rejected without
    /// any mutation.
    #[error("validation error: {0}")]
    Validation(String),
}

impl DomainError {
    /// Shorthand for a validation failure.
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }
}
