//! Environment-driven configuration.

use std::time::Duration;

use crate::engine::settlement::SettlementConfig;

/// Process configuration, loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP bind address.
    pub bind_addr: String,
    /// Postgres connection string. Absent means the in-memory store (dev).
    pub database_url: Option<String>,
    /// HS256 secret for bearer-token validation.
    pub jwt_secret: String,
    /// Razorpay API key id. Absent means the mock gateway (dev).
    pub gateway_key_id: Option<String>,
    /// Razorpay API key secret.
    pub gateway_key_secret: String,
    /// ISO currency code for gateway orders.
    pub currency: String,
    /// Prefix for gateway order receipts.
    pub receipt_prefix: String,
    pub settlement: SettlementConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            "dev-secret".to_string()
        });

        let gateway_key_id = std::env::var("RAZORPAY_KEY_ID").ok();
        let gateway_key_secret = std::env::var("RAZORPAY_KEY_SECRET").unwrap_or_else(|_| {
            if gateway_key_id.is_some() {
                tracing::warn!("RAZORPAY_KEY_SECRET not set; signature verification will fail");
            }
            "dev-gateway-secret".to_string()
        });

        let settlement = SettlementConfig {
            enabled: env_bool("REFUND_SWEEP_ENABLED", false),
            poll_interval: Duration::from_millis(env_u64("REFUND_SWEEP_INTERVAL_MS", 2_000)),
            auto_complete_after_minutes: env_u64("REFUND_AUTO_COMPLETE_AFTER_MINUTES", 5) as i64,
        };

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
            jwt_secret,
            gateway_key_id,
            gateway_key_secret,
            currency: std::env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "INR".to_string()),
            receipt_prefix: std::env::var("RECEIPT_PREFIX").unwrap_or_else(|_| "rcpt".to_string()),
            settlement,
        }
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
