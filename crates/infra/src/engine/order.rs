//! Order engine: placement, manufacturer decisions, shipment, delivery,
//! cancellation. Owns stock movement and the order state machine.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tradegate_auth::Actor;
use tradegate_core::{AddressId, DomainError, OrderId, OrderItemId, ProductId, UserId};
use tradegate_orders::{
    Order, OrderEvent, OrderEventType, OrderItem, OrderSide, OrderStatus,
};

use crate::engine::{refund, EngineError, EngineResult};
use crate::store::{MarketStore, MarketTx};

/// One requested order line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub address_id: AddressId,
    pub items: Vec<PlaceOrderItem>,
}

/// What the caller gets back from placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub total_amount: u64,
}

#[derive(Clone)]
pub struct OrderEngine {
    store: Arc<dyn MarketStore>,
}

impl OrderEngine {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self { store }
    }

    /// Buyer places an order.
    ///
    /// Stock is decremented line by line under the product row lock; every
    /// item snapshots the current unit price. All of it commits atomically
    /// with the order row and the `ORDER_PLACED` event.
    #[instrument(skip(self, request), fields(buyer = %actor.user_id))]
    pub async fn place_order(&self, actor: &Actor, request: PlaceOrderRequest) -> EngineResult<PlacedOrder> {
        if !actor.role.can_buy() {
            return Err(DomainError::Unauthorized.into());
        }
        if request.items.is_empty() {
            return Err(DomainError::validation("order must contain at least one item").into());
        }

        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let address = tx
            .find_address_owned(request.address_id, actor.user_id)
            .await?
            .ok_or(DomainError::not_found("Address"))?;

        let order_id = OrderId::new();
        let mut seller: Option<UserId> = None;
        let mut items = Vec::with_capacity(request.items.len());

        for line in &request.items {
            let mut product = tx
                .find_product_for_update(line.product_id)
                .await?
                .ok_or(DomainError::not_found("Product"))?;
            if !product.active {
                return Err(DomainError::not_found("Product").into());
            }

            // Single-seller-per-order rule.
            match seller {
                None => seller = Some(product.seller_id),
                Some(s) if s != product.seller_id => {
                    return Err(DomainError::invalid_transition(
                        "all items in an order must belong to the same seller",
                    )
                    .into());
                }
                Some(_) => {}
            }

            product.reserve(line.quantity)?;
            tx.update_product_stock(product.id, product.stock).await?;

            items.push(OrderItem {
                id: OrderItemId::new(),
                order_id,
                product_id: product.id,
                quantity: line.quantity,
                unit_price: product.unit_price,
            });
        }

        let seller_id = seller.ok_or_else(|| DomainError::validation("order must contain at least one item"))?;
        let order = Order::place(order_id, actor.user_id, seller_id, items, address.snapshot(), now)?;

        tx.insert_order(&order).await?;
        tx.insert_order_event(&OrderEvent::new(
            order_id,
            OrderEventType::OrderPlaced,
            None,
            Some(OrderStatus::Created),
            Some(actor.user_id),
            Some(format!("Order placed ({} line items)", order.items.len())),
            now,
        ))
        .await?;
        tx.commit().await?;

        Ok(PlacedOrder {
            order_id,
            total_amount: order.total_amount,
        })
    }

    /// Seller accepts a `CONFIRMED` order.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn accept_order(&self, actor: &Actor, order_id: OrderId) -> EngineResult<()> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let mut order = self.owned_order(tx.as_mut(), actor, order_id).await?;

        let from = order.transition(OrderStatus::Accepted, Some(actor.user_id), now)?;
        tx.update_order(&order).await?;
        tx.insert_order_event(&OrderEvent::status_changed(
            order_id,
            from,
            OrderStatus::Accepted,
            Some(actor.user_id),
            Some("Order accepted by seller".to_string()),
            now,
        ))
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Seller rejects a `CONFIRMED` order. The buyer already paid, so this
    /// triggers the automatic refund path in the same transaction.
    #[instrument(skip(self, reason), fields(order_id = %order_id))]
    pub async fn reject_order(
        &self,
        actor: &Actor,
        order_id: OrderId,
        reason: Option<String>,
    ) -> EngineResult<()> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let mut order = self.owned_order(tx.as_mut(), actor, order_id).await?;

        let from = order.transition(OrderStatus::Rejected, Some(actor.user_id), now)?;
        tx.update_order(&order).await?;
        let note = match &reason {
            Some(r) => format!("Order rejected by seller: {r}"),
            None => "Order rejected by seller".to_string(),
        };
        tx.insert_order_event(&OrderEvent::status_changed(
            order_id,
            from,
            OrderStatus::Rejected,
            Some(actor.user_id),
            Some(note),
            now,
        ))
        .await?;

        refund::auto_refund_in_tx(
            tx.as_mut(),
            &order,
            Some(actor.user_id),
            reason,
            "Refund processing started (seller rejected after payment)",
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Generic seller transition (accept/reject/ship/deliver by status name).
    #[instrument(skip(self), fields(order_id = %order_id, to = %new_status))]
    pub async fn update_status(
        &self,
        actor: &Actor,
        order_id: OrderId,
        new_status: OrderStatus,
    ) -> EngineResult<()> {
        if !new_status.seller_settable() {
            return Err(DomainError::invalid_transition(format!(
                "{new_status} cannot be set directly"
            ))
            .into());
        }

        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let mut order = self.owned_order(tx.as_mut(), actor, order_id).await?;

        let from = match new_status {
            // Delivery stamps its timestamp even through the generic endpoint.
            OrderStatus::Delivered => order.mark_delivered(actor.user_id, now)?,
            _ => order.transition(new_status, Some(actor.user_id), now)?,
        };
        tx.update_order(&order).await?;
        tx.insert_order_event(&OrderEvent::status_changed(
            order_id,
            from,
            new_status,
            Some(actor.user_id),
            Some("Order status updated by seller".to_string()),
            now,
        ))
        .await?;

        if new_status == OrderStatus::Rejected {
            refund::auto_refund_in_tx(
                tx.as_mut(),
                &order,
                Some(actor.user_id),
                None,
                "Refund processing started (seller rejected after payment)",
                now,
            )
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Seller ships an `ACCEPTED` order with tracking details.
    #[instrument(skip(self, carrier, tracking_number, tracking_url), fields(order_id = %order_id))]
    pub async fn create_shipment(
        &self,
        actor: &Actor,
        order_id: OrderId,
        carrier: String,
        tracking_number: String,
        tracking_url: Option<String>,
    ) -> EngineResult<()> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let mut order = self.owned_order(tx.as_mut(), actor, order_id).await?;

        let note = format!("Shipment created: {carrier} / {tracking_number}");
        let from = order.create_shipment(carrier, tracking_number, tracking_url, actor.user_id, now)?;
        tx.update_order(&order).await?;
        tx.insert_order_event(&OrderEvent::status_changed(
            order_id,
            from,
            OrderStatus::Shipped,
            Some(actor.user_id),
            Some(note),
            now,
        ))
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Seller marks a `SHIPPED` order delivered.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn mark_delivered(&self, actor: &Actor, order_id: OrderId) -> EngineResult<()> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let mut order = self.owned_order(tx.as_mut(), actor, order_id).await?;

        let from = order.mark_delivered(actor.user_id, now)?;
        tx.update_order(&order).await?;
        tx.insert_order_event(&OrderEvent::status_changed(
            order_id,
            from,
            OrderStatus::Delivered,
            Some(actor.user_id),
            Some("Order delivered".to_string()),
            now,
        ))
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Buyer or seller cancels the order.
    ///
    /// Restocks every line, then routes paid orders into the refund engine:
    /// buyer cancellation creates an approval-gated refund request, seller
    /// cancellation refunds automatically.
    #[instrument(skip(self, reason), fields(order_id = %order_id, actor = %actor.user_id))]
    pub async fn cancel_order(
        &self,
        actor: &Actor,
        order_id: OrderId,
        reason: Option<String>,
    ) -> EngineResult<()> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let mut order = tx
            .find_order(order_id)
            .await?
            .ok_or(DomainError::not_found("Order"))?;

        let outcome = order.cancel(actor.user_id, now)?;

        for item in &order.items {
            let mut product = tx
                .find_product_for_update(item.product_id)
                .await?
                .ok_or(DomainError::not_found("Product"))?;
            product.restock(item.quantity)?;
            tx.update_product_stock(product.id, product.stock).await?;
        }

        tx.update_order(&order).await?;
        tx.insert_order_event(&OrderEvent::new(
            order_id,
            OrderEventType::OrderCancelled,
            Some(outcome.from),
            Some(OrderStatus::Cancelled),
            Some(actor.user_id),
            reason.clone().or_else(|| Some("Order cancelled".to_string())),
            now,
        ))
        .await?;

        // Payment was captured once the order left CREATED.
        let was_paid = matches!(outcome.from, OrderStatus::Confirmed | OrderStatus::Accepted);
        if was_paid {
            match outcome.cancelled_by {
                OrderSide::Buyer => {
                    refund::request_refund_in_tx(tx.as_mut(), &order, actor.user_id, reason, now).await?;
                }
                OrderSide::Seller => {
                    refund::auto_refund_in_tx(
                        tx.as_mut(),
                        &order,
                        Some(actor.user_id),
                        reason,
                        "Refund processing started (seller cancelled after payment)",
                        now,
                    )
                    .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Fetch one order; caller must be a participant.
    pub async fn get_order(&self, actor: &Actor, order_id: OrderId) -> EngineResult<Order> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .find_order(order_id)
            .await?
            .ok_or(DomainError::not_found("Order"))?;
        if !order.is_participant(actor.user_id) {
            return Err(DomainError::Unauthorized.into());
        }
        Ok(order)
    }

    /// Orders the actor participates in, newest first.
    pub async fn list_orders(&self, actor: &Actor, limit: i64, offset: i64) -> EngineResult<Vec<Order>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_orders_for_user(actor.user_id, limit, offset).await?)
    }

    /// Audit trail for an order; caller must be a participant.
    pub async fn order_events(&self, actor: &Actor, order_id: OrderId) -> EngineResult<Vec<OrderEvent>> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .find_order(order_id)
            .await?
            .ok_or(DomainError::not_found("Order"))?;
        if !order.is_participant(actor.user_id) {
            return Err(DomainError::Unauthorized.into());
        }
        Ok(tx.list_order_events(order_id).await?)
    }

    /// Resolve an order the acting seller owns, for fulfillment operations.
    async fn owned_order(
        &self,
        tx: &mut dyn MarketTx,
        actor: &Actor,
        order_id: OrderId,
    ) -> Result<Order, EngineError> {
        if !actor.role.can_fulfill() {
            return Err(DomainError::Unauthorized.into());
        }
        let order = tx
            .find_order(order_id)
            .await?
            .ok_or(DomainError::not_found("Order"))?;
        if order.seller_id != actor.user_id {
            return Err(DomainError::Unauthorized.into());
        }
        Ok(order)
    }
}
