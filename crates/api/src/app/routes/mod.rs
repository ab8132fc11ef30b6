//! HTTP routes, one file per domain area.

use axum::Router;

pub mod orders;
pub mod payments;
pub mod system;

pub fn router() -> Router {
    Router::new()
        .merge(orders::router())
        .merge(payments::router())
}
