//! `tradegate-invoicing` — invoice entity.
//!
//! Invoices are issued exactly once per paid order and cancelled (never
//! deleted) when a refund starts processing.

pub mod invoice;

pub use invoice::{Invoice, InvoiceStatus};
