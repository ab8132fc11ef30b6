//! Order, order items and the rules governing their lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradegate_core::{
    AuditStamp, DomainError, DomainResult, Entity, OrderId, OrderItemId, ProductId, UserId,
};

use crate::status::OrderStatus;

/// Delivery address snapshot, copied from the buyer's address book at
/// placement time. Later edits to the source address do not propagate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub name: String,
    pub phone: String,
    pub line1: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

/// Shipment details set by the seller when the order leaves the warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub carrier: String,
    pub tracking_number: String,
    pub tracking_url: Option<String>,
    pub shipped_at: DateTime<Utc>,
}

/// A single ordered line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    /// Unit price in smallest currency unit, captured at order time.
    /// Never re-read from the live product.
    pub unit_price: u64,
}

/// Which side of the order a user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buyer,
    Seller,
}

/// Result of a successful cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelOutcome {
    /// Status the order was in before cancellation.
    pub from: OrderStatus,
    pub cancelled_by: OrderSide,
}

/// An order placed by a buyer against a single seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub status: OrderStatus,
    /// Total in smallest currency unit: the sum of line subtotals at
    /// placement time. Never recomputed afterwards.
    pub total_amount: u64,
    pub delivery: DeliveryAddress,
    pub shipment: Option<Shipment>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItem>,
    pub audit: AuditStamp,
}

impl Order {
    /// Assemble a freshly placed order in `CREATED` status.
    ///
    /// Items must be non-empty; the total is derived from the snapshotted
    /// line prices.
    pub fn place(
        id: OrderId,
        buyer_id: UserId,
        seller_id: UserId,
        items: Vec<OrderItem>,
        delivery: DeliveryAddress,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if items.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }

        let mut total_amount: u64 = 0;
        for item in &items {
            if item.quantity <= 0 {
                return Err(DomainError::validation("item quantity must be positive"));
            }
            total_amount += item.unit_price * item.quantity as u64;
        }

        Ok(Self {
            id,
            buyer_id,
            seller_id,
            status: OrderStatus::Created,
            total_amount,
            delivery,
            shipment: None,
            delivered_at: None,
            items,
            audit: AuditStamp::on_create(Some(buyer_id), now),
        })
    }

    pub fn side_of(&self, user: UserId) -> Option<OrderSide> {
        if user == self.buyer_id {
            Some(OrderSide::Buyer)
        } else if user == self.seller_id {
            Some(OrderSide::Seller)
        } else {
            None
        }
    }

    pub fn is_participant(&self, user: UserId) -> bool {
        self.side_of(user).is_some()
    }

    /// Move the order to `to`, enforcing the transition graph.
    ///
    /// Returns the status the order was in before the move.
    pub fn transition(
        &mut self,
        to: OrderStatus,
        actor: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<OrderStatus> {
        let from = self.status;
        if from.is_terminal() {
            return Err(DomainError::invalid_transition(format!(
                "order is {from} and cannot change status"
            )));
        }
        if !from.can_transition(to) {
            return Err(DomainError::invalid_transition(format!(
                "cannot move order from {from} to {to}"
            )));
        }
        self.status = to;
        self.audit.touch(actor, now);
        Ok(from)
    }

    /// Seller ships an `ACCEPTED` order.
    pub fn create_shipment(
        &mut self,
        carrier: String,
        tracking_number: String,
        tracking_url: Option<String>,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<OrderStatus> {
        if self.status != OrderStatus::Accepted {
            return Err(DomainError::invalid_transition(format!(
                "only ACCEPTED orders can be shipped (status {})",
                self.status
            )));
        }
        self.shipment = Some(Shipment {
            carrier,
            tracking_number,
            tracking_url,
            shipped_at: now,
        });
        self.transition(OrderStatus::Shipped, Some(actor), now)
    }

    /// Seller marks a `SHIPPED` order as delivered.
    pub fn mark_delivered(&mut self, actor: UserId, now: DateTime<Utc>) -> DomainResult<OrderStatus> {
        if self.status != OrderStatus::Shipped {
            return Err(DomainError::invalid_transition(format!(
                "only SHIPPED orders can be delivered (status {})",
                self.status
            )));
        }
        self.delivered_at = Some(now);
        self.transition(OrderStatus::Delivered, Some(actor), now)
    }

    /// Cancel the order on behalf of `actor`.
    ///
    /// Stage-dependent authorization: before payment (`CREATED`) only the
    /// buyer may cancel; after payment (`CONFIRMED`/`ACCEPTED`) either side
    /// may. Restocking and refund follow-up are the engine's responsibility.
    pub fn cancel(&mut self, actor: UserId, now: DateTime<Utc>) -> DomainResult<CancelOutcome> {
        let side = self.side_of(actor).ok_or(DomainError::Unauthorized)?;

        use OrderStatus::*;
        match self.status {
            Cancelled | Rejected | Shipped | Delivered => {
                return Err(DomainError::invalid_transition(format!(
                    "order is {} and can no longer be cancelled",
                    self.status
                )));
            }
            Created => {
                if side != OrderSide::Buyer {
                    return Err(DomainError::invalid_transition(
                        "only the buyer may cancel before payment",
                    ));
                }
            }
            Confirmed | Accepted => {}
        }

        let from = self.transition(OrderStatus::Cancelled, Some(actor), now)?;
        Ok(CancelOutcome {
            from,
            cancelled_by: side,
        })
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
