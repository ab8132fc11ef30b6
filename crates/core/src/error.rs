//! Domain error model.

use thiserror::Error;

use crate::id::OrderId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic business/domain failures. Infrastructure
/// concerns (connection loss, serialization) belong elsewhere.
///
/// Authorization failures and state-machine violations are deliberately
/// separate variants: `Unauthorized` means "this actor may never do this",
/// `InvalidTransition` means "this actor may do this, but not right now".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A requested resource was not found (or is not visible to the caller).
    #[error("{resource} not found")]
    NotFound { resource: &'static str },

    /// The acting user is not allowed to perform this operation at all.
    #[error("unauthorized")]
    Unauthorized,

    /// The operation is legal for this actor, but not in the current state.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Requested quantity exceeds the available stock.
    #[error("insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: i64,
        available: i64,
    },

    /// Payment was attempted against an order that is not payable.
    #[error("order {order} is not payable (status {status})")]
    InvalidOrderStatus { order: OrderId, status: String },

    /// Payment gateway signature verification failed.
    #[error("invalid payment signature")]
    InvalidSignature,

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A conflict occurred (e.g. a concurrent writer won a uniqueness race
    /// and no fallback applies).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
