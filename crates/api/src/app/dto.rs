//! Request/response DTOs and JSON mapping helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradegate_core::{AddressId, ProductId};
use tradegate_invoicing::Invoice;
use tradegate_orders::{Order, OrderEvent};
use tradegate_payments::Payment;
use tradegate_refunds::Refund;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub address_id: AddressId,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct RejectOrderRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateShipmentRequest {
    pub carrier: String,
    pub tracking_number: String,
    pub tracking_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefundDecisionRequest {
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentOrderRequest {
    pub order_id: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub order_id: String,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: u64,
}

#[derive(Debug, Serialize)]
pub struct DeliveryAddressResponse {
    pub name: String,
    pub phone: String,
    pub line1: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

#[derive(Debug, Serialize)]
pub struct ShipmentResponse {
    pub carrier: String,
    pub tracking_number: String,
    pub tracking_url: Option<String>,
    pub shipped_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub status: String,
    pub total_amount: u64,
    pub delivery: DeliveryAddressResponse,
    pub shipment: Option<ShipmentResponse>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            buyer_id: order.buyer_id.to_string(),
            seller_id: order.seller_id.to_string(),
            status: order.status.to_string(),
            total_amount: order.total_amount,
            delivery: DeliveryAddressResponse {
                name: order.delivery.name.clone(),
                phone: order.delivery.phone.clone(),
                line1: order.delivery.line1.clone(),
                city: order.delivery.city.clone(),
                state: order.delivery.state.clone(),
                pincode: order.delivery.pincode.clone(),
            },
            shipment: order.shipment.as_ref().map(|s| ShipmentResponse {
                carrier: s.carrier.clone(),
                tracking_number: s.tracking_number.clone(),
                tracking_url: s.tracking_url.clone(),
                shipped_at: s.shipped_at,
            }),
            delivered_at: order.delivered_at,
            items: order
                .items
                .iter()
                .map(|item| OrderItemResponse {
                    id: item.id.to_string(),
                    product_id: item.product_id.to_string(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
            created_at: order.audit.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderEventResponse {
    pub id: String,
    pub order_id: String,
    pub event_type: String,
    pub from_status: Option<String>,
    pub to_status: Option<String>,
    pub actor_id: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&OrderEvent> for OrderEventResponse {
    fn from(event: &OrderEvent) -> Self {
        Self {
            id: event.id.to_string(),
            order_id: event.order_id.to_string(),
            event_type: event.event_type.to_string(),
            from_status: event.from_status.map(|s| s.to_string()),
            to_status: event.to_status.map(|s| s.to_string()),
            actor_id: event.actor_id.map(|a| a.to_string()),
            note: event.note.clone(),
            created_at: event.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub order_id: String,
    pub buyer_id: String,
    pub amount: u64,
    pub status: String,
    pub gateway: String,
    pub gateway_order_id: Option<String>,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.id.to_string(),
            order_id: payment.order_id.to_string(),
            buyer_id: payment.buyer_id.to_string(),
            amount: payment.amount,
            status: payment.status.to_string(),
            gateway: payment.gateway.clone(),
            gateway_order_id: payment.gateway_order_id.clone(),
            payment_reference: payment.payment_reference.clone(),
            created_at: payment.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: String,
    pub invoice_number: String,
    pub order_id: String,
    pub amount: u64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Invoice> for InvoiceResponse {
    fn from(invoice: &Invoice) -> Self {
        Self {
            id: invoice.id.to_string(),
            invoice_number: invoice.invoice_number.clone(),
            order_id: invoice.order_id.to_string(),
            amount: invoice.amount,
            status: invoice.status.to_string(),
            created_at: invoice.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RefundResponse {
    pub id: String,
    pub order_id: String,
    pub payment_id: String,
    pub gateway: String,
    pub initiated_by: String,
    pub status: String,
    pub reason: Option<String>,
    pub seller_note: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub refund_reference: Option<String>,
}

impl From<&Refund> for RefundResponse {
    fn from(refund: &Refund) -> Self {
        Self {
            id: refund.id.to_string(),
            order_id: refund.order_id.to_string(),
            payment_id: refund.payment_id.to_string(),
            gateway: refund.gateway.clone(),
            initiated_by: refund.initiated_by.as_str().to_string(),
            status: refund.status.to_string(),
            reason: refund.reason.clone(),
            seller_note: refund.seller_note.clone(),
            requested_at: refund.requested_at,
            approved_at: refund.approved_at,
            processed_at: refund.processed_at,
            refund_reference: refund.refund_reference.clone(),
        }
    }
}
