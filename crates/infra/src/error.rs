//! Persistence and service error types.
//!
//! `StoreError` covers storage failures only. `ServiceError` is what every
//! service operation returns: the domain taxonomy plus the storage cases, with
//! a retryability classification for callers.

use thiserror::Error;

use stockflow_core::{DomainError, ProductId};

pub type StoreResult<T> = Result<T, StoreError>;
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Storage operation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Serialization failure, deadlock, lock timeout or a racing insert.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    /// A database constraint rejected the write.
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// A stored row could not be decoded into its domain type.
    #[error("malformed stored data: {0}")]
    Corrupt(String),

    /// The store could not be reached (pool closed, timeout, IO).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    /// Whether retrying the same operation unchanged may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Conflict(_) | StoreError::Unavailable(_) | StoreError::Database(_)
        )
    }
}

/// Outcome of a service operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error(
        "insufficient stock for product {product_id}: required {required}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        required: i64,
        available: i64,
    },

    #[error("invalid status transition from '{from}' to '{to}'")]
    InvalidTransition { from: &'static str, to: &'static str },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A concurrent transaction touched the same rows; retry.
    #[error("transition conflict: {0}")]
    TransitionConflict(String),

    #[error("storage error: {0}")]
    Storage(StoreError),
}

impl ServiceError {
    /// `InsufficientStock`, validation and graph errors need changed input;
    /// conflicts and transient storage failures do not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::TransitionConflict(_) => true,
            ServiceError::Storage(err) => err.is_transient(),
            ServiceError::Validation(_)
            | ServiceError::NotFound { .. }
            | ServiceError::InsufficientStock { .. }
            | ServiceError::InvalidTransition { .. }
            | ServiceError::InvariantViolation(_) => false,
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvariantViolation(msg) => ServiceError::InvariantViolation(msg),
            DomainError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            DomainError::InsufficientStock {
                product_id,
                required,
                available,
            } => ServiceError::InsufficientStock {
                product_id,
                required,
                available,
            },
            DomainError::InvalidTransition { from, to } => {
                ServiceError::InvalidTransition { from, to }
            }
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => ServiceError::TransitionConflict(msg),
            other => ServiceError::Storage(other),
        }
    }
}
