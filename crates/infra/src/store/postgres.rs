//! Postgres-backed store implementation.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `UniqueViolation` | Concurrent insert of the payment/invoice/refund row for one order |
//! | Database (other) | Any other | `Backend` | Constraint/serialization failures |
//! | PoolClosed / RowNotFound / Other | N/A | `Backend` | Connection loss, unexpected shapes |
//!
//! ## Savepoints
//!
//! The payment/invoice/refund inserts run inside a savepoint. Postgres aborts
//! the whole transaction after any statement error, which would make the
//! engines' "catch the unique violation, read the winner's row" fallback
//! impossible; rolling back to the savepoint keeps the enclosing transaction
//! usable.
//!
//! ## Locking
//!
//! `find_product_for_update` issues `SELECT ... FOR UPDATE`, so stock
//! decrements (placement) and increments (cancellation) hold a row lock for
//! the rest of the transaction. Two concurrent placements against the same
//! product serialize on that lock instead of overselling.
//!
//! ## Thread Safety
//!
//! `PostgresStore` is `Send + Sync` and can be shared across request
//! handlers; SQLx's connection pool handles connection management.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Acquire, PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use tradegate_catalog::Product;
use tradegate_core::{AddressId, AuditStamp, DomainError, OrderId, ProductId, UserId};
use tradegate_invoicing::{Invoice, InvoiceStatus};
use tradegate_orders::{DeliveryAddress, Order, OrderEvent, OrderEventType, OrderItem, OrderStatus, Shipment};
use tradegate_payments::{Payment, PaymentStatus};
use tradegate_refunds::{Refund, RefundInitiatedBy, RefundStatus};

use super::{Address, MarketStore, MarketTx, StoreError, StoreResult, UniqueConstraint};

/// Persistent marketplace store.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and run pending migrations.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&*self.pool)
            .await
            .map_err(|e| StoreError::backend(format!("migrate: {e}")))
    }
}

#[async_trait]
impl MarketStore for PostgresStore {
    async fn begin(&self) -> StoreResult<Box<dyn MarketTx>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        Ok(Box::new(PostgresTx { tx }))
    }
}

struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl MarketTx for PostgresTx {
    async fn insert_address(&mut self, address: &Address) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO addresses
                (id, owner_id, name, phone, line1, city, state, pincode,
                 created_at, updated_at, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(address.id.as_uuid())
        .bind(address.owner_id.as_uuid())
        .bind(&address.name)
        .bind(&address.phone)
        .bind(&address.line1)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.pincode)
        .bind(address.audit.created_at)
        .bind(address.audit.updated_at)
        .bind(address.audit.created_by.map(Uuid::from))
        .bind(address.audit.updated_by.map(Uuid::from))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_address", e))?;
        Ok(())
    }

    async fn find_address_owned(&mut self, id: AddressId, owner: UserId) -> StoreResult<Option<Address>> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, name, phone, line1, city, state, pincode,
                   created_at, updated_at, created_by, updated_by
            FROM addresses
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(owner.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_address_owned", e))?;

        row.map(|r| address_from_row(&r)).transpose()
    }

    async fn insert_product(&mut self, product: &Product) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products
                (id, seller_id, name, unit_price, stock, active,
                 created_at, updated_at, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.seller_id.as_uuid())
        .bind(&product.name)
        .bind(product.unit_price as i64)
        .bind(product.stock)
        .bind(product.active)
        .bind(product.audit.created_at)
        .bind(product.audit.updated_at)
        .bind(product.audit.created_by.map(Uuid::from))
        .bind(product.audit.updated_by.map(Uuid::from))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn find_product_for_update(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, seller_id, name, unit_price, stock, active,
                   created_at, updated_at, created_by, updated_by
            FROM products
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_product_for_update", e))?;

        row.map(|r| product_from_row(&r)).transpose()
    }

    async fn update_product_stock(&mut self, id: ProductId, stock: i64) -> StoreResult<()> {
        let result = sqlx::query("UPDATE products SET stock = $2, updated_at = NOW() WHERE id = $1")
            .bind(id.as_uuid())
            .bind(stock)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("update_product_stock", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::backend(format!("product {id} not found for stock update")));
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders
                (id, buyer_id, seller_id, status, total_amount,
                 delivery_name, delivery_phone, delivery_line1,
                 delivery_city, delivery_state, delivery_pincode,
                 created_at, updated_at, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.buyer_id.as_uuid())
        .bind(order.seller_id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.total_amount as i64)
        .bind(&order.delivery.name)
        .bind(&order.delivery.phone)
        .bind(&order.delivery.line1)
        .bind(&order.delivery.city)
        .bind(&order.delivery.state)
        .bind(&order.delivery.pincode)
        .bind(order.audit.created_at)
        .bind(order.audit.updated_at)
        .bind(order.audit.created_by.map(Uuid::from))
        .bind(order.audit.updated_by.map(Uuid::from))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(item.order_id.as_uuid())
            .bind(item.product_id.as_uuid())
            .bind(item.quantity)
            .bind(item.unit_price as i64)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order_item", e))?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(order_id = %id))]
    async fn find_order(&mut self, id: OrderId) -> StoreResult<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, buyer_id, seller_id, status, total_amount,
                   delivery_name, delivery_phone, delivery_line1,
                   delivery_city, delivery_state, delivery_pincode,
                   shipment_carrier, shipment_tracking_number, shipment_tracking_url,
                   shipped_at, delivered_at,
                   created_at, updated_at, created_by, updated_by
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_order", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut order = order_from_row(&row)?;
        order.items = self.load_items(id).await?;
        Ok(Some(order))
    }

    async fn update_order(&mut self, order: &Order) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = $2,
                shipment_carrier = $3,
                shipment_tracking_number = $4,
                shipment_tracking_url = $5,
                shipped_at = $6,
                delivered_at = $7,
                updated_at = $8,
                updated_by = $9
            WHERE id = $1
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.shipment.as_ref().map(|s| s.carrier.as_str()))
        .bind(order.shipment.as_ref().map(|s| s.tracking_number.as_str()))
        .bind(order.shipment.as_ref().and_then(|s| s.tracking_url.as_deref()))
        .bind(order.shipment.as_ref().map(|s| s.shipped_at))
        .bind(order.delivered_at)
        .bind(order.audit.updated_at)
        .bind(order.audit.updated_by.map(Uuid::from))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_order", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::backend(format!("order {} not found for update", order.id)));
        }
        Ok(())
    }

    async fn list_orders_for_user(&mut self, user: UserId, limit: i64, offset: i64) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, buyer_id, seller_id, status, total_amount,
                   delivery_name, delivery_phone, delivery_line1,
                   delivery_city, delivery_state, delivery_pincode,
                   shipment_carrier, shipment_tracking_number, shipment_tracking_url,
                   shipped_at, delivered_at,
                   created_at, updated_at, created_by, updated_by
            FROM orders
            WHERE buyer_id = $1 OR seller_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user.as_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_orders_for_user", e))?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let mut order = order_from_row(&row)?;
            order.items = self.load_items(order.id).await?;
            orders.push(order);
        }
        Ok(orders)
    }

    async fn insert_order_event(&mut self, event: &OrderEvent) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO order_events
                (id, order_id, event_type, from_status, to_status, actor_id, note, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.order_id.as_uuid())
        .bind(event.event_type.as_str())
        .bind(event.from_status.map(|s| s.as_str()))
        .bind(event.to_status.map(|s| s.as_str()))
        .bind(event.actor_id.map(Uuid::from))
        .bind(event.note.as_deref())
        .bind(event.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order_event", e))?;
        Ok(())
    }

    async fn list_order_events(&mut self, order: OrderId) -> StoreResult<Vec<OrderEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, event_type, from_status, to_status, actor_id, note, created_at
            FROM order_events
            WHERE order_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(order.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_order_events", e))?;

        rows.iter().map(event_from_row).collect()
    }

    #[instrument(skip(self, payment), fields(order_id = %payment.order_id))]
    async fn insert_payment(&mut self, payment: &Payment) -> StoreResult<()> {
        let mut sp = self
            .tx
            .begin()
            .await
            .map_err(|e| map_sqlx_error("insert_payment", e))?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO payments
                (id, order_id, buyer_id, amount, status, gateway,
                 gateway_order_id, gateway_payment_id, payment_reference, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.order_id.as_uuid())
        .bind(payment.buyer_id.as_uuid())
        .bind(payment.amount as i64)
        .bind(payment.status.as_str())
        .bind(&payment.gateway)
        .bind(payment.gateway_order_id.as_deref())
        .bind(payment.gateway_payment_id.as_deref())
        .bind(payment.payment_reference.as_deref())
        .bind(payment.created_at)
        .execute(&mut *sp)
        .await;

        match inserted {
            Ok(_) => sp.commit().await.map_err(|e| map_sqlx_error("insert_payment", e)),
            Err(e) => {
                let mapped = map_sqlx_error("insert_payment", e);
                let _ = sp.rollback().await;
                Err(mapped)
            }
        }
    }

    async fn find_payment_by_order(&mut self, order: OrderId) -> StoreResult<Option<Payment>> {
        let row = sqlx::query(
            r#"
            SELECT id, order_id, buyer_id, amount, status, gateway,
                   gateway_order_id, gateway_payment_id, payment_reference, created_at
            FROM payments
            WHERE order_id = $1
            "#,
        )
        .bind(order.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_payment_by_order", e))?;

        row.map(|r| payment_from_row(&r)).transpose()
    }

    async fn update_payment(&mut self, payment: &Payment) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET
                status = $2,
                gateway_payment_id = $3,
                payment_reference = $4
            WHERE id = $1
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.status.as_str())
        .bind(payment.gateway_payment_id.as_deref())
        .bind(payment.payment_reference.as_deref())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_payment", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::backend(format!("payment {} not found for update", payment.id)));
        }
        Ok(())
    }

    async fn insert_invoice(&mut self, invoice: &Invoice) -> StoreResult<()> {
        let mut sp = self
            .tx
            .begin()
            .await
            .map_err(|e| map_sqlx_error("insert_invoice", e))?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO invoices
                (id, invoice_number, order_id, buyer_id, amount, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(invoice.id.as_uuid())
        .bind(&invoice.invoice_number)
        .bind(invoice.order_id.as_uuid())
        .bind(invoice.buyer_id.as_uuid())
        .bind(invoice.amount as i64)
        .bind(invoice.status.as_str())
        .bind(invoice.created_at)
        .execute(&mut *sp)
        .await;

        match inserted {
            Ok(_) => sp.commit().await.map_err(|e| map_sqlx_error("insert_invoice", e)),
            Err(e) => {
                let mapped = map_sqlx_error("insert_invoice", e);
                let _ = sp.rollback().await;
                Err(mapped)
            }
        }
    }

    async fn find_invoice_by_order(&mut self, order: OrderId) -> StoreResult<Option<Invoice>> {
        let row = sqlx::query(
            r#"
            SELECT id, invoice_number, order_id, buyer_id, amount, status, created_at
            FROM invoices
            WHERE order_id = $1
            "#,
        )
        .bind(order.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_invoice_by_order", e))?;

        row.map(|r| invoice_from_row(&r)).transpose()
    }

    async fn update_invoice(&mut self, invoice: &Invoice) -> StoreResult<()> {
        let result = sqlx::query("UPDATE invoices SET status = $2 WHERE id = $1")
            .bind(invoice.id.as_uuid())
            .bind(invoice.status.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("update_invoice", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::backend(format!("invoice {} not found for update", invoice.id)));
        }
        Ok(())
    }

    #[instrument(skip(self, refund), fields(order_id = %refund.order_id))]
    async fn insert_refund(&mut self, refund: &Refund) -> StoreResult<()> {
        let mut sp = self
            .tx
            .begin()
            .await
            .map_err(|e| map_sqlx_error("insert_refund", e))?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO refunds
                (id, order_id, payment_id, gateway, initiated_by, status,
                 reason, seller_note, requested_at, approved_at, processed_at,
                 refund_reference, created_at, updated_at, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(refund.id.as_uuid())
        .bind(refund.order_id.as_uuid())
        .bind(refund.payment_id.as_uuid())
        .bind(&refund.gateway)
        .bind(refund.initiated_by.as_str())
        .bind(refund.status.as_str())
        .bind(refund.reason.as_deref())
        .bind(refund.seller_note.as_deref())
        .bind(refund.requested_at)
        .bind(refund.approved_at)
        .bind(refund.processed_at)
        .bind(refund.refund_reference.as_deref())
        .bind(refund.audit.created_at)
        .bind(refund.audit.updated_at)
        .bind(refund.audit.created_by.map(Uuid::from))
        .bind(refund.audit.updated_by.map(Uuid::from))
        .execute(&mut *sp)
        .await;

        match inserted {
            Ok(_) => sp.commit().await.map_err(|e| map_sqlx_error("insert_refund", e)),
            Err(e) => {
                let mapped = map_sqlx_error("insert_refund", e);
                let _ = sp.rollback().await;
                Err(mapped)
            }
        }
    }

    async fn find_refund_by_order(&mut self, order: OrderId) -> StoreResult<Option<Refund>> {
        let row = sqlx::query(&format!("{REFUND_SELECT} WHERE order_id = $1"))
            .bind(order.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_refund_by_order", e))?;

        row.map(|r| refund_from_row(&r)).transpose()
    }

    async fn update_refund(&mut self, refund: &Refund) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE refunds SET
                status = $2,
                seller_note = $3,
                approved_at = $4,
                processed_at = $5,
                refund_reference = $6,
                updated_at = $7,
                updated_by = $8
            WHERE id = $1
            "#,
        )
        .bind(refund.id.as_uuid())
        .bind(refund.status.as_str())
        .bind(refund.seller_note.as_deref())
        .bind(refund.approved_at)
        .bind(refund.processed_at)
        .bind(refund.refund_reference.as_deref())
        .bind(refund.audit.updated_at)
        .bind(refund.audit.updated_by.map(Uuid::from))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_refund", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::backend(format!("refund {} not found for update", refund.id)));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_processing_refunds_started_before(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<Refund>> {
        let rows = sqlx::query(&format!(
            "{REFUND_SELECT} WHERE status = 'PROCESSING' AND approved_at < $1 ORDER BY approved_at ASC"
        ))
        .bind(cutoff)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_processing_refunds_started_before", e))?;

        rows.iter().map(refund_from_row).collect()
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }
}

impl PostgresTx {
    async fn load_items(&mut self, order: OrderId) -> StoreResult<Vec<OrderItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price
            FROM order_items
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("load_items", e))?;

        rows.iter()
            .map(|row| {
                Ok(OrderItem {
                    id: get_id(row, "id")?,
                    order_id: get_id(row, "order_id")?,
                    product_id: get_id(row, "product_id")?,
                    quantity: get(row, "quantity")?,
                    unit_price: get::<i64>(row, "unit_price")? as u64,
                })
            })
            .collect()
    }
}

const REFUND_SELECT: &str = r#"
    SELECT id, order_id, payment_id, gateway, initiated_by, status,
           reason, seller_note, requested_at, approved_at, processed_at,
           refund_reference, created_at, updated_at, created_by, updated_by
    FROM refunds
"#;

fn map_sqlx_error(op: &'static str, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("23505") {
            let constraint = match db.constraint() {
                Some("payments_order_id_key") => Some(UniqueConstraint::PaymentPerOrder),
                Some("invoices_order_id_key") => Some(UniqueConstraint::InvoicePerOrder),
                Some("refunds_order_id_key") => Some(UniqueConstraint::RefundPerOrder),
                _ => None,
            };
            if let Some(constraint) = constraint {
                return StoreError::UniqueViolation(constraint);
            }
        }
    }
    StoreError::Backend(format!("{op}: {e}"))
}

fn get<'r, T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>>(
    row: &'r PgRow,
    column: &str,
) -> StoreResult<T> {
    row.try_get(column)
        .map_err(|e| StoreError::backend(format!("column {column}: {e}")))
}

fn get_id<T: From<Uuid>>(row: &PgRow, column: &str) -> StoreResult<T> {
    Ok(T::from(get::<Uuid>(row, column)?))
}

fn get_opt_id<T: From<Uuid>>(row: &PgRow, column: &str) -> StoreResult<Option<T>> {
    Ok(get::<Option<Uuid>>(row, column)?.map(T::from))
}

fn parse_status<T: FromStr<Err = DomainError>>(value: String) -> StoreResult<T> {
    value
        .parse()
        .map_err(|e: DomainError| StoreError::backend(format!("stored value rejected: {e}")))
}

fn audit_from_row(row: &PgRow) -> StoreResult<AuditStamp> {
    Ok(AuditStamp {
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
        created_by: get_opt_id(row, "created_by")?,
        updated_by: get_opt_id(row, "updated_by")?,
    })
}

fn address_from_row(row: &PgRow) -> StoreResult<Address> {
    Ok(Address {
        id: get_id(row, "id")?,
        owner_id: get_id(row, "owner_id")?,
        name: get(row, "name")?,
        phone: get(row, "phone")?,
        line1: get(row, "line1")?,
        city: get(row, "city")?,
        state: get(row, "state")?,
        pincode: get(row, "pincode")?,
        audit: audit_from_row(row)?,
    })
}

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
    Ok(Product {
        id: get_id(row, "id")?,
        seller_id: get_id(row, "seller_id")?,
        name: get(row, "name")?,
        unit_price: get::<i64>(row, "unit_price")? as u64,
        stock: get(row, "stock")?,
        active: get(row, "active")?,
        audit: audit_from_row(row)?,
    })
}

fn order_from_row(row: &PgRow) -> StoreResult<Order> {
    let shipment = match get::<Option<String>>(row, "shipment_carrier")? {
        Some(carrier) => Some(Shipment {
            carrier,
            tracking_number: get::<Option<String>>(row, "shipment_tracking_number")?
                .unwrap_or_default(),
            tracking_url: get(row, "shipment_tracking_url")?,
            shipped_at: get::<Option<DateTime<Utc>>>(row, "shipped_at")?
                .ok_or_else(|| StoreError::backend("shipment without shipped_at"))?,
        }),
        None => None,
    };

    Ok(Order {
        id: get_id(row, "id")?,
        buyer_id: get_id(row, "buyer_id")?,
        seller_id: get_id(row, "seller_id")?,
        status: parse_status::<OrderStatus>(get(row, "status")?)?,
        total_amount: get::<i64>(row, "total_amount")? as u64,
        delivery: DeliveryAddress {
            name: get(row, "delivery_name")?,
            phone: get(row, "delivery_phone")?,
            line1: get(row, "delivery_line1")?,
            city: get(row, "delivery_city")?,
            state: get(row, "delivery_state")?,
            pincode: get(row, "delivery_pincode")?,
        },
        shipment,
        delivered_at: get(row, "delivered_at")?,
        items: Vec::new(),
        audit: audit_from_row(row)?,
    })
}

fn event_from_row(row: &PgRow) -> StoreResult<OrderEvent> {
    Ok(OrderEvent {
        id: get_id(row, "id")?,
        order_id: get_id(row, "order_id")?,
        event_type: parse_status::<OrderEventType>(get(row, "event_type")?)?,
        from_status: get::<Option<String>>(row, "from_status")?
            .map(parse_status::<OrderStatus>)
            .transpose()?,
        to_status: get::<Option<String>>(row, "to_status")?
            .map(parse_status::<OrderStatus>)
            .transpose()?,
        actor_id: get_opt_id(row, "actor_id")?,
        note: get(row, "note")?,
        created_at: get(row, "created_at")?,
    })
}

fn payment_from_row(row: &PgRow) -> StoreResult<Payment> {
    Ok(Payment {
        id: get_id(row, "id")?,
        order_id: get_id(row, "order_id")?,
        buyer_id: get_id(row, "buyer_id")?,
        amount: get::<i64>(row, "amount")? as u64,
        status: parse_status::<PaymentStatus>(get(row, "status")?)?,
        gateway: get(row, "gateway")?,
        gateway_order_id: get(row, "gateway_order_id")?,
        gateway_payment_id: get(row, "gateway_payment_id")?,
        payment_reference: get(row, "payment_reference")?,
        created_at: get(row, "created_at")?,
    })
}

fn invoice_from_row(row: &PgRow) -> StoreResult<Invoice> {
    Ok(Invoice {
        id: get_id(row, "id")?,
        invoice_number: get(row, "invoice_number")?,
        order_id: get_id(row, "order_id")?,
        buyer_id: get_id(row, "buyer_id")?,
        amount: get::<i64>(row, "amount")? as u64,
        status: parse_status::<InvoiceStatus>(get(row, "status")?)?,
        created_at: get(row, "created_at")?,
    })
}

fn refund_from_row(row: &PgRow) -> StoreResult<Refund> {
    Ok(Refund {
        id: get_id(row, "id")?,
        order_id: get_id(row, "order_id")?,
        payment_id: get_id(row, "payment_id")?,
        gateway: get(row, "gateway")?,
        initiated_by: parse_status::<RefundInitiatedBy>(get(row, "initiated_by")?)?,
        status: parse_status::<RefundStatus>(get(row, "status")?)?,
        reason: get(row, "reason")?,
        seller_note: get(row, "seller_note")?,
        requested_at: get(row, "requested_at")?,
        approved_at: get(row, "approved_at")?,
        processed_at: get(row, "processed_at")?,
        refund_reference: get(row, "refund_reference")?,
        audit: audit_from_row(row)?,
    })
}
