//! Append-only audit trail entries for orders.
//!
//! Events are facts: once recorded they are never updated or deleted. Every
//! engine operation appends its events inside the same transaction as the
//! state change it describes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradegate_core::{DomainError, OrderEventId, OrderId, UserId};

use crate::status::OrderStatus;

/// What happened to the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEventType {
    OrderPlaced,
    StatusChanged,
    PaymentCreated,
    InvoiceGenerated,
    OrderCancelled,
    RefundRequested,
    RefundApproved,
    RefundProcessing,
    RefundRejected,
    RefundProcessed,
}

impl OrderEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderEventType::OrderPlaced => "ORDER_PLACED",
            OrderEventType::StatusChanged => "STATUS_CHANGED",
            OrderEventType::PaymentCreated => "PAYMENT_CREATED",
            OrderEventType::InvoiceGenerated => "INVOICE_GENERATED",
            OrderEventType::OrderCancelled => "ORDER_CANCELLED",
            OrderEventType::RefundRequested => "REFUND_REQUESTED",
            OrderEventType::RefundApproved => "REFUND_APPROVED",
            OrderEventType::RefundProcessing => "REFUND_PROCESSING",
            OrderEventType::RefundRejected => "REFUND_REJECTED",
            OrderEventType::RefundProcessed => "REFUND_PROCESSED",
        }
    }
}

impl core::fmt::Display for OrderEventType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for OrderEventType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ORDER_PLACED" => Ok(OrderEventType::OrderPlaced),
            "STATUS_CHANGED" => Ok(OrderEventType::StatusChanged),
            "PAYMENT_CREATED" => Ok(OrderEventType::PaymentCreated),
            "INVOICE_GENERATED" => Ok(OrderEventType::InvoiceGenerated),
            "ORDER_CANCELLED" => Ok(OrderEventType::OrderCancelled),
            "REFUND_REQUESTED" => Ok(OrderEventType::RefundRequested),
            "REFUND_APPROVED" => Ok(OrderEventType::RefundApproved),
            "REFUND_PROCESSING" => Ok(OrderEventType::RefundProcessing),
            "REFUND_REJECTED" => Ok(OrderEventType::RefundRejected),
            "REFUND_PROCESSED" => Ok(OrderEventType::RefundProcessed),
            other => Err(DomainError::validation(format!("unknown event type: {other}"))),
        }
    }
}

/// One audit trail row.
///
/// `from_status`/`to_status` are `None` for events that do not move the order
/// (e.g. `PAYMENT_CREATED`); `actor_id` is `None` for system actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub id: OrderEventId,
    pub order_id: OrderId,
    pub event_type: OrderEventType,
    pub from_status: Option<OrderStatus>,
    pub to_status: Option<OrderStatus>,
    pub actor_id: Option<UserId>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OrderEvent {
    pub fn new(
        order_id: OrderId,
        event_type: OrderEventType,
        from_status: Option<OrderStatus>,
        to_status: Option<OrderStatus>,
        actor_id: Option<UserId>,
        note: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderEventId::new(),
            order_id,
            event_type,
            from_status,
            to_status,
            actor_id,
            note,
            created_at,
        }
    }

    /// Shorthand for a status-move event.
    pub fn status_changed(
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        actor_id: Option<UserId>,
        note: impl Into<Option<String>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            order_id,
            OrderEventType::StatusChanged,
            Some(from),
            Some(to),
            actor_id,
            note.into(),
            created_at,
        )
    }
}
