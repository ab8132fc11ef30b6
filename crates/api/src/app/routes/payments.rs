//! Two-phase payment routes: create the gateway order, verify the checkout.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use tradegate_auth::Actor;
use tradegate_core::OrderId;
use tradegate_infra::engine::payment::VerifyPaymentRequest;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().nest("/payments", payments_router())
}

fn payments_router() -> Router {
    Router::new()
        .route("/order", post(create_payment_order))
        .route("/verify", post(verify_payment))
}

fn parse_order_id(id: &str) -> Result<OrderId, axum::response::Response> {
    id.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", "invalid order id")
    })
}

pub async fn create_payment_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<dto::CreatePaymentOrderRequest>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&body.order_id) {
        Ok(v) => v,
        Err(response) => return response,
    };

    match services.payments.create_gateway_order(&actor, order_id).await {
        Ok(outcome) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "order_id": outcome.order_id.to_string(),
                "gateway_order_id": outcome.gateway_order_id,
                "amount": outcome.amount,
                "currency": outcome.currency,
            })),
        )
            .into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn verify_payment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<dto::VerifyPaymentRequest>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&body.order_id) {
        Ok(v) => v,
        Err(response) => return response,
    };

    let request = VerifyPaymentRequest {
        order_id,
        gateway_order_id: body.gateway_order_id,
        gateway_payment_id: body.gateway_payment_id,
        signature: body.signature,
    };

    match services.payments.verify_payment(&actor, request).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({"message": "Payment verified"})),
        )
            .into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}
