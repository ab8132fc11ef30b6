//! Payment gateway port.
//!
//! One configured gateway per deployment. The engine never assumes a specific
//! provider beyond this contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A remote gateway-side order, created before checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    /// Provider-assigned order id (`gateway_order_id` on the payment).
    pub id: String,
    pub amount_minor: u64,
    pub currency: String,
}

/// Result of a refund initiation at the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRefund {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The provider rejected the request or returned an unusable response.
    #[error("gateway request failed: {0}")]
    Request(String),

    /// Transport-level failure (timeout, connection).
    #[error("gateway unreachable: {0}")]
    Transport(String),
}

/// Abstraction over the external payment provider.
#[async_trait]
pub trait PaymentGatewayClient: Send + Sync {
    /// Stable provider name, persisted on payments and refunds.
    fn name(&self) -> &'static str;

    /// Create a provider-side order to check out against.
    async fn create_order(
        &self,
        amount_minor: u64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError>;

    /// Verify the checkout signature the provider handed to the client.
    ///
    /// Any verification problem is a plain `false`; callers treat it as an
    /// invalid signature rather than an infrastructure failure.
    fn verify_signature(&self, gateway_order_id: &str, gateway_payment_id: &str, signature: &str) -> bool;

    /// Initiate a full refund of a captured payment.
    async fn refund_payment(
        &self,
        gateway_payment_id: &str,
        amount_minor: u64,
    ) -> Result<GatewayRefund, GatewayError>;
}
