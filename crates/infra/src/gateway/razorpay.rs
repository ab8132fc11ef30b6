//! Razorpay client via REST API (no SDK dependency).

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::instrument;

use tradegate_payments::{GatewayError, GatewayOrder, GatewayRefund, PaymentGatewayClient};

const API_BASE: &str = "https://api.razorpay.com/v1";

/// Hosted-checkout gateway client.
///
/// Signature verification is local: HMAC-SHA256 over
/// `"{order_id}|{payment_id}"` with the key secret, hex-encoded.
pub struct RazorpayGateway {
    http: reqwest::Client,
    key_id: String,
    key_secret: String,
}

impl RazorpayGateway {
    /// All gateway calls get a bounded timeout; there is no way to cancel an
    /// in-flight call from outside, so it must not hang.
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        }
    }

    async fn post_json(&self, url: String, body: serde_json::Value) -> Result<serde_json::Value, GatewayError> {
        let response = self
            .http
            .post(url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Request(format!("malformed response: {e}")))?;

        if !status.is_success() {
            return Err(GatewayError::Request(format!("status {status}: {value}")));
        }
        Ok(value)
    }
}

fn string_field(value: &serde_json::Value, field: &str) -> Result<String, GatewayError> {
    value[field]
        .as_str()
        .map(String::from)
        .ok_or_else(|| GatewayError::Request(format!("response missing `{field}`: {value}")))
}

#[async_trait]
impl PaymentGatewayClient for RazorpayGateway {
    fn name(&self) -> &'static str {
        "RAZORPAY"
    }

    #[instrument(skip(self))]
    async fn create_order(
        &self,
        amount_minor: u64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        let body = serde_json::json!({
            "amount": amount_minor,
            "currency": currency,
            "receipt": receipt,
        });
        let value = self.post_json(format!("{API_BASE}/orders"), body).await?;

        Ok(GatewayOrder {
            id: string_field(&value, "id")?,
            amount_minor: value["amount"].as_u64().unwrap_or(amount_minor),
            currency: string_field(&value, "currency")?,
        })
    }

    fn verify_signature(&self, gateway_order_id: &str, gateway_payment_id: &str, signature: &str) -> bool {
        let Ok(provided) = hex::decode(signature) else {
            return false;
        };
        let mut mac = match Hmac::<Sha256>::new_from_slice(self.key_secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(format!("{gateway_order_id}|{gateway_payment_id}").as_bytes());
        mac.verify_slice(&provided).is_ok()
    }

    #[instrument(skip(self))]
    async fn refund_payment(
        &self,
        gateway_payment_id: &str,
        amount_minor: u64,
    ) -> Result<GatewayRefund, GatewayError> {
        let body = serde_json::json!({ "amount": amount_minor });
        let value = self
            .post_json(format!("{API_BASE}/payments/{gateway_payment_id}/refund"), body)
            .await?;

        Ok(GatewayRefund {
            id: string_field(&value, "id")?,
            status: string_field(&value, "status")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, order_id: &str, payment_id: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{order_id}|{payment_id}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn signature_round_trip() {
        let gateway = RazorpayGateway::new("key", "secret");
        let signature = sign("secret", "order_1", "pay_1");
        assert!(gateway.verify_signature("order_1", "pay_1", &signature));
        assert!(!gateway.verify_signature("order_1", "pay_2", &signature));
        assert!(!gateway.verify_signature("order_1", "pay_1", "not-hex"));
    }
}
