//! Deterministic gateway for tests and development.
//!
//! Uses the same HMAC-SHA256 signature scheme as the real client so tests
//! can mint valid checkout signatures, and exposes a failure switch for the
//! refund call to exercise the settlement fallback path.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use tradegate_payments::{GatewayError, GatewayOrder, GatewayRefund, PaymentGatewayClient};

pub struct MockGateway {
    secret: String,
    counter: AtomicU64,
    fail_refunds: AtomicBool,
}

impl MockGateway {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            counter: AtomicU64::new(0),
            fail_refunds: AtomicBool::new(false),
        }
    }

    /// Make subsequent `refund_payment` calls fail (or succeed again).
    pub fn set_fail_refunds(&self, fail: bool) {
        self.fail_refunds.store(fail, Ordering::SeqCst);
    }

    /// Mint a valid checkout signature, as the provider would.
    pub fn sign(&self, gateway_order_id: &str, gateway_payment_id: &str) -> String {
        let mut mac = match Hmac::<Sha256>::new_from_slice(self.secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(format!("{gateway_order_id}|{gateway_payment_id}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

#[async_trait]
impl PaymentGatewayClient for MockGateway {
    fn name(&self) -> &'static str {
        "MOCK"
    }

    async fn create_order(
        &self,
        amount_minor: u64,
        currency: &str,
        _receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(GatewayOrder {
            id: format!("order_mock_{n}"),
            amount_minor,
            currency: currency.to_string(),
        })
    }

    fn verify_signature(&self, gateway_order_id: &str, gateway_payment_id: &str, signature: &str) -> bool {
        let Ok(provided) = hex::decode(signature) else {
            return false;
        };
        let mut mac = match Hmac::<Sha256>::new_from_slice(self.secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(format!("{gateway_order_id}|{gateway_payment_id}").as_bytes());
        mac.verify_slice(&provided).is_ok()
    }

    async fn refund_payment(
        &self,
        gateway_payment_id: &str,
        _amount_minor: u64,
    ) -> Result<GatewayRefund, GatewayError> {
        if self.fail_refunds.load(Ordering::SeqCst) {
            return Err(GatewayError::Request(format!(
                "refund rejected for {gateway_payment_id}"
            )));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(GatewayRefund {
            id: format!("rfnd_mock_{n}"),
            status: "processed".to_string(),
        })
    }
}
