//! In-memory store implementation.
//!
//! Transactions are serialized behind an async mutex: `begin` takes the lock,
//! every read/write works on a staged copy, and `commit` swaps the staged
//! state back in. Dropping the transaction releases the lock and discards the
//! staged copy, which gives the same all-or-nothing behavior the Postgres
//! store gets from database transactions.
//!
//! Uniqueness of payments/invoices/refunds per order is checked on insert, so
//! the engines' unique-violation fallbacks behave the same against both
//! backends.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use tradegate_catalog::Product;
use tradegate_core::{AddressId, OrderId, ProductId, UserId};
use tradegate_invoicing::Invoice;
use tradegate_orders::{Order, OrderEvent};
use tradegate_payments::Payment;
use tradegate_refunds::{Refund, RefundStatus};

use super::{Address, MarketStore, MarketTx, StoreError, StoreResult, UniqueConstraint};

/// Everything the store holds. Rows live in plain vectors so uniqueness is a
/// checked constraint (as in the database), not a structural accident.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub addresses: Vec<Address>,
    pub products: Vec<Product>,
    pub orders: Vec<Order>,
    pub order_events: Vec<OrderEvent>,
    pub payments: Vec<Payment>,
    pub invoices: Vec<Invoice>,
    pub refunds: Vec<Refund>,
}

/// Serialized in-process store for tests and development.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only copy of the committed state (test/diagnostic support).
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn MarketTx>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl MarketTx for MemoryTx {
    async fn insert_address(&mut self, address: &Address) -> StoreResult<()> {
        self.staged.addresses.push(address.clone());
        Ok(())
    }

    async fn find_address_owned(&mut self, id: AddressId, owner: UserId) -> StoreResult<Option<Address>> {
        Ok(self
            .staged
            .addresses
            .iter()
            .find(|a| a.id == id && a.owner_id == owner)
            .cloned())
    }

    async fn insert_product(&mut self, product: &Product) -> StoreResult<()> {
        self.staged.products.push(product.clone());
        Ok(())
    }

    async fn find_product_for_update(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.staged.products.iter().find(|p| p.id == id).cloned())
    }

    async fn update_product_stock(&mut self, id: ProductId, stock: i64) -> StoreResult<()> {
        let product = self
            .staged
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::backend(format!("product {id} not found for stock update")))?;
        product.stock = stock;
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
        self.staged.orders.push(order.clone());
        Ok(())
    }

    async fn find_order(&mut self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.staged.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn update_order(&mut self, order: &Order) -> StoreResult<()> {
        let slot = self
            .staged
            .orders
            .iter_mut()
            .find(|o| o.id == order.id)
            .ok_or_else(|| StoreError::backend(format!("order {} not found for update", order.id)))?;
        *slot = order.clone();
        Ok(())
    }

    async fn list_orders_for_user(&mut self, user: UserId, limit: i64, offset: i64) -> StoreResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .staged
            .orders
            .iter()
            .filter(|o| o.buyer_id == user || o.seller_id == user)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.audit.created_at.cmp(&a.audit.created_at));
        Ok(orders
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn insert_order_event(&mut self, event: &OrderEvent) -> StoreResult<()> {
        self.staged.order_events.push(event.clone());
        Ok(())
    }

    async fn list_order_events(&mut self, order: OrderId) -> StoreResult<Vec<OrderEvent>> {
        let mut events: Vec<OrderEvent> = self
            .staged
            .order_events
            .iter()
            .filter(|e| e.order_id == order)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(events)
    }

    async fn insert_payment(&mut self, payment: &Payment) -> StoreResult<()> {
        if self.staged.payments.iter().any(|p| p.order_id == payment.order_id) {
            return Err(StoreError::UniqueViolation(UniqueConstraint::PaymentPerOrder));
        }
        self.staged.payments.push(payment.clone());
        Ok(())
    }

    async fn find_payment_by_order(&mut self, order: OrderId) -> StoreResult<Option<Payment>> {
        Ok(self.staged.payments.iter().find(|p| p.order_id == order).cloned())
    }

    async fn update_payment(&mut self, payment: &Payment) -> StoreResult<()> {
        let slot = self
            .staged
            .payments
            .iter_mut()
            .find(|p| p.id == payment.id)
            .ok_or_else(|| StoreError::backend(format!("payment {} not found for update", payment.id)))?;
        *slot = payment.clone();
        Ok(())
    }

    async fn insert_invoice(&mut self, invoice: &Invoice) -> StoreResult<()> {
        if self.staged.invoices.iter().any(|i| i.order_id == invoice.order_id) {
            return Err(StoreError::UniqueViolation(UniqueConstraint::InvoicePerOrder));
        }
        self.staged.invoices.push(invoice.clone());
        Ok(())
    }

    async fn find_invoice_by_order(&mut self, order: OrderId) -> StoreResult<Option<Invoice>> {
        Ok(self.staged.invoices.iter().find(|i| i.order_id == order).cloned())
    }

    async fn update_invoice(&mut self, invoice: &Invoice) -> StoreResult<()> {
        let slot = self
            .staged
            .invoices
            .iter_mut()
            .find(|i| i.id == invoice.id)
            .ok_or_else(|| StoreError::backend(format!("invoice {} not found for update", invoice.id)))?;
        *slot = invoice.clone();
        Ok(())
    }

    async fn insert_refund(&mut self, refund: &Refund) -> StoreResult<()> {
        if self.staged.refunds.iter().any(|r| r.order_id == refund.order_id) {
            return Err(StoreError::UniqueViolation(UniqueConstraint::RefundPerOrder));
        }
        self.staged.refunds.push(refund.clone());
        Ok(())
    }

    async fn find_refund_by_order(&mut self, order: OrderId) -> StoreResult<Option<Refund>> {
        Ok(self.staged.refunds.iter().find(|r| r.order_id == order).cloned())
    }

    async fn update_refund(&mut self, refund: &Refund) -> StoreResult<()> {
        let slot = self
            .staged
            .refunds
            .iter_mut()
            .find(|r| r.id == refund.id)
            .ok_or_else(|| StoreError::backend(format!("refund {} not found for update", refund.id)))?;
        *slot = refund.clone();
        Ok(())
    }

    async fn list_processing_refunds_started_before(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<Refund>> {
        Ok(self
            .staged
            .refunds
            .iter()
            .filter(|r| {
                r.status == RefundStatus::Processing
                    && r.approved_at.is_some_and(|started| started < cutoff)
            })
            .cloned()
            .collect())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
