//! `tradegate-refunds` — refund entity and approval/settlement rules.

pub mod refund;

pub use refund::{Refund, RefundInitiatedBy, RefundStatus};
