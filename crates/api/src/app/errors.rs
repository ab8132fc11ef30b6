//! Consistent error responses.
//!
//! Every failure maps to a stable machine-readable `code` plus a human
//! message. State-machine violations keep the 403 contract of the external
//! API even though the engine distinguishes them from authorization failures.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use tradegate_core::DomainError;
use tradegate_infra::EngineError;

pub fn engine_error_to_response(err: EngineError) -> axum::response::Response {
    match err {
        EngineError::Domain(e) => domain_error_to_response(e),
        EngineError::Store(e) => {
            tracing::error!(error = %e, "storage failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "unexpected storage failure",
            )
        }
        EngineError::Gateway(e) => {
            tracing::error!(error = %e, "payment gateway failure");
            json_error(StatusCode::BAD_GATEWAY, "PAYMENT_GATEWAY_ERROR", e.to_string())
        }
    }
}

fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        DomainError::NotFound { .. } => {
            json_error(StatusCode::NOT_FOUND, "RESOURCE_NOT_FOUND", message)
        }
        DomainError::Unauthorized => {
            json_error(StatusCode::FORBIDDEN, "ORDER_ACCESS_DENIED", message)
        }
        DomainError::InvalidTransition(_) => json_error(StatusCode::FORBIDDEN, "FORBIDDEN", message),
        DomainError::InsufficientStock { .. } => {
            json_error(StatusCode::BAD_REQUEST, "INSUFFICIENT_STOCK", message)
        }
        DomainError::InvalidOrderStatus { .. } => {
            json_error(StatusCode::BAD_REQUEST, "INVALID_ORDER_STATUS", message)
        }
        DomainError::InvalidSignature => {
            json_error(StatusCode::BAD_REQUEST, "INVALID_PAYMENT_SIGNATURE", message)
        }
        DomainError::Validation(_) | DomainError::InvalidId(_) => {
            json_error(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message)
        }
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, "CONFLICT", message),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "status": status.as_u16(),
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
