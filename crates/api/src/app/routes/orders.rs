//! Order lifecycle routes: placement, fulfillment, cancellation, refunds,
//! and the read side (order, events, invoice, payment, refund).

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use tradegate_auth::Actor;
use tradegate_core::OrderId;
use tradegate_infra::engine::order::{PlaceOrderItem, PlaceOrderRequest};
use tradegate_orders::OrderStatus;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().nest("/orders", orders_router())
}

fn orders_router() -> Router {
    Router::new()
        .route("/", post(place_order).get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id/events", get(get_order_events))
        .route("/:id/invoice", get(get_invoice))
        .route("/:id/payment", get(get_payment))
        .route("/:id/accept", post(accept_order))
        .route("/:id/reject", post(reject_order))
        .route("/:id/status", put(update_order_status))
        .route("/:id/shipment", post(create_shipment))
        .route("/:id/deliver", post(mark_delivered))
        .route("/:id/cancel", post(cancel_order))
        .route("/:id/refund", get(get_refund))
        .route("/:id/refund/approve", post(approve_refund))
        .route("/:id/refund/reject", post(reject_refund))
}

fn parse_order_id(id: &str) -> Result<OrderId, axum::response::Response> {
    id.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", "invalid order id")
    })
}

pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<dto::PlaceOrderRequest>,
) -> axum::response::Response {
    let request = PlaceOrderRequest {
        address_id: body.address_id,
        items: body
            .items
            .iter()
            .map(|item| PlaceOrderItem {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect(),
    };

    match services.orders.place_order(&actor, request).await {
        Ok(placed) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "order_id": placed.order_id.to_string(),
                "total_amount": placed.total_amount,
            })),
        )
            .into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<dto::ListQuery>,
) -> axum::response::Response {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    match services.orders.list_orders(&actor, limit, offset).await {
        Ok(orders) => {
            let body: Vec<dto::OrderResponse> = orders.iter().map(Into::into).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    match services.orders.get_order(&actor, order_id).await {
        Ok(order) => (StatusCode::OK, Json(dto::OrderResponse::from(&order))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn get_order_events(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    match services.orders.order_events(&actor, order_id).await {
        Ok(events) => {
            let body: Vec<dto::OrderEventResponse> = events.iter().map(Into::into).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn get_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    match services.payments.get_invoice(&actor, order_id).await {
        Ok(invoice) => (StatusCode::OK, Json(dto::InvoiceResponse::from(&invoice))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn get_payment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    match services.payments.get_payment(&actor, order_id).await {
        Ok(payment) => (StatusCode::OK, Json(dto::PaymentResponse::from(&payment))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn accept_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    match services.orders.accept_order(&actor, order_id).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"message": "Order accepted"}))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn reject_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    body: Option<Json<dto::RejectOrderRequest>>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let reason = body.and_then(|Json(b)| b.reason);
    match services.orders.reject_order(&actor, order_id, reason).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"message": "Order rejected"}))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn update_order_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateOrderStatusRequest>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let new_status: OrderStatus = match body.status.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                format!("unknown order status: {}", body.status),
            )
        }
    };
    match services.orders.update_status(&actor, order_id, new_status).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({"message": "Order status updated"})),
        )
            .into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn create_shipment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(body): Json<dto::CreateShipmentRequest>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    match services
        .orders
        .create_shipment(&actor, order_id, body.carrier, body.tracking_number, body.tracking_url)
        .await
    {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"message": "Shipment created"}))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn mark_delivered(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    match services.orders.mark_delivered(&actor, order_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({"message": "Order marked as delivered"})),
        )
            .into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    body: Option<Json<dto::CancelOrderRequest>>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let reason = body.and_then(|Json(b)| b.reason);
    match services.orders.cancel_order(&actor, order_id, reason).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"message": "Order cancelled"}))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn get_refund(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    match services.refunds.get_refund(&actor, order_id).await {
        Ok(refund) => (StatusCode::OK, Json(dto::RefundResponse::from(&refund))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn approve_refund(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    body: Option<Json<dto::RefundDecisionRequest>>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let note = body.and_then(|Json(b)| b.note);
    match services.refunds.approve_refund(&actor, order_id, note).await {
        Ok(refund) => (StatusCode::OK, Json(dto::RefundResponse::from(&refund))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn reject_refund(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    body: Option<Json<dto::RefundDecisionRequest>>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let note = body.and_then(|Json(b)| b.note);
    match services.refunds.reject_refund(&actor, order_id, note).await {
        Ok(refund) => (StatusCode::OK, Json(dto::RefundResponse::from(&refund))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}
