//! Transactional engines driving the order/payment/refund lifecycle.
//!
//! Each public operation: begin one transaction, read, validate against the
//! domain rules, write, append audit events, commit. Nothing spans two
//! transactions; a failure rolls the whole operation back.

use thiserror::Error;

use tradegate_core::DomainError;
use tradegate_payments::GatewayError;

use crate::store::StoreError;

pub mod order;
pub mod payment;
pub mod refund;
pub mod settlement;

pub use order::OrderEngine;
pub use payment::PaymentEngine;
pub use refund::RefundEngine;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Deterministic business failure; maps to a 4xx at the HTTP edge.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Storage failure; maps to a 5xx.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Payment provider failure outside the signature-verification contract.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
