//! `tradegate-payments` — payment entity, status chain and the gateway port.
//!
//! The gateway port is the single seam to the external payment provider;
//! implementations live in infra so this crate stays free of HTTP concerns.

pub mod gateway;
pub mod payment;

pub use gateway::{GatewayError, GatewayOrder, GatewayRefund, PaymentGatewayClient};
pub use payment::{Payment, PaymentStatus};
