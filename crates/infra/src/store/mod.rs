//! Storage contract for the marketplace core.
//!
//! Two implementations exist:
//! - [`MemoryStore`]: serialized in-process store for tests and development.
//! - [`PostgresStore`]: the persistent store, backed by SQLx/PostgreSQL.
//!
//! The transaction object [`MarketTx`] is the unit of atomicity: engines
//! begin a transaction, perform every read/write of one operation through it,
//! then commit. Dropping a transaction without committing rolls it back.
//!
//! The uniqueness constraints on payments/invoices/refunds per order are
//! load-bearing for idempotency: inserts surface them as
//! [`StoreError::UniqueViolation`] so engines can fall back to reading the
//! winning row instead of failing the request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tradegate_catalog::Product;
use tradegate_core::{AddressId, AuditStamp, OrderId, ProductId, UserId};
use tradegate_invoicing::Invoice;
use tradegate_orders::{DeliveryAddress, Order, OrderEvent};
use tradegate_payments::Payment;
use tradegate_refunds::Refund;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Uniqueness constraints the engines rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueConstraint {
    /// At most one payment row per order.
    PaymentPerOrder,
    /// At most one invoice row per order.
    InvoicePerOrder,
    /// At most one refund row per order.
    RefundPerOrder,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected an insert. Callers treat this as
    /// "another writer got there first" and re-read instead of failing.
    #[error("unique constraint violated: {0:?}")]
    UniqueViolation(UniqueConstraint),

    /// Any other storage failure (connection, serialization, missing row on
    /// update). Not a business outcome.
    #[error("storage error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// A buyer's address book entry (collaborator surface).
///
/// The engine resolves an address by `(id, owner)` only; there is no way to
/// enumerate or probe other users' addresses through this contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub owner_id: UserId,
    pub name: String,
    pub phone: String,
    pub line1: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub audit: AuditStamp,
}

impl Address {
    /// Copy the deliverable fields into an immutable order snapshot.
    pub fn snapshot(&self) -> DeliveryAddress {
        DeliveryAddress {
            name: self.name.clone(),
            phone: self.phone.clone(),
            line1: self.line1.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            pincode: self.pincode.clone(),
        }
    }
}

/// One atomic unit of work against the store.
///
/// All reads within a transaction observe a consistent snapshot; all writes
/// become visible only on `commit`. Dropping the transaction discards them.
#[async_trait]
pub trait MarketTx: Send {
    // -- addresses (collaborator surface) --
    async fn insert_address(&mut self, address: &Address) -> StoreResult<()>;
    async fn find_address_owned(&mut self, id: AddressId, owner: UserId) -> StoreResult<Option<Address>>;

    // -- products (collaborator surface + stock movement) --
    async fn insert_product(&mut self, product: &Product) -> StoreResult<()>;
    /// Resolve a product, locking its row for the rest of the transaction
    /// (placement/cancellation mutate stock under this lock).
    async fn find_product_for_update(&mut self, id: ProductId) -> StoreResult<Option<Product>>;
    async fn update_product_stock(&mut self, id: ProductId, stock: i64) -> StoreResult<()>;

    // -- orders --
    async fn insert_order(&mut self, order: &Order) -> StoreResult<()>;
    /// Load an order including its items.
    async fn find_order(&mut self, id: OrderId) -> StoreResult<Option<Order>>;
    /// Persist mutable order state (status, shipment, delivery timestamps, audit).
    async fn update_order(&mut self, order: &Order) -> StoreResult<()>;
    async fn list_orders_for_user(&mut self, user: UserId, limit: i64, offset: i64) -> StoreResult<Vec<Order>>;

    // -- audit trail (append-only; no update/delete surface exists) --
    async fn insert_order_event(&mut self, event: &OrderEvent) -> StoreResult<()>;
    async fn list_order_events(&mut self, order: OrderId) -> StoreResult<Vec<OrderEvent>>;

    // -- payments --
    async fn insert_payment(&mut self, payment: &Payment) -> StoreResult<()>;
    async fn find_payment_by_order(&mut self, order: OrderId) -> StoreResult<Option<Payment>>;
    async fn update_payment(&mut self, payment: &Payment) -> StoreResult<()>;

    // -- invoices --
    async fn insert_invoice(&mut self, invoice: &Invoice) -> StoreResult<()>;
    async fn find_invoice_by_order(&mut self, order: OrderId) -> StoreResult<Option<Invoice>>;
    async fn update_invoice(&mut self, invoice: &Invoice) -> StoreResult<()>;

    // -- refunds --
    async fn insert_refund(&mut self, refund: &Refund) -> StoreResult<()>;
    async fn find_refund_by_order(&mut self, order: OrderId) -> StoreResult<Option<Refund>>;
    async fn update_refund(&mut self, refund: &Refund) -> StoreResult<()>;
    /// Refunds in `PROCESSING` whose processing-start clock is older than `cutoff`.
    async fn list_processing_refunds_started_before(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<Refund>>;

    /// Commit every write performed through this transaction.
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Handle to the marketplace store.
#[async_trait]
pub trait MarketStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn MarketTx>>;
}
