//! Domain error model.

use thiserror::Error;

use crate::id::ProductId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, stock shortfalls). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (unknown status, malformed line item, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A requested resource was not found.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A debit asked for more than the stock row holds.
    #[error(
        "insufficient stock for product {product_id}: required {required}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        required: i64,
        available: i64,
    },

    /// The requested status is known but not reachable from the current one.
    #[error("invalid status transition from '{from}' to '{to}'")]
    InvalidTransition { from: &'static str, to: &'static str },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn insufficient_stock(product_id: ProductId, required: i64, available: i64) -> Self {
        Self::InsufficientStock {
            product_id,
            required,
            available,
        }
    }
}
