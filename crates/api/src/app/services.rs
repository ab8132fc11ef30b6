//! Engine wiring over the chosen store and gateway.

use std::sync::Arc;

use tradegate_infra::engine::payment::PaymentOptions;
use tradegate_infra::{MarketStore, OrderEngine, PaymentEngine, RefundEngine};
use tradegate_payments::PaymentGatewayClient;

/// Everything the HTTP handlers need.
#[derive(Clone)]
pub struct AppServices {
    pub orders: OrderEngine,
    pub payments: PaymentEngine,
    pub refunds: RefundEngine,
}

impl AppServices {
    pub fn new(
        store: Arc<dyn MarketStore>,
        gateway: Arc<dyn PaymentGatewayClient>,
        options: PaymentOptions,
    ) -> Self {
        Self {
            orders: OrderEngine::new(store.clone()),
            payments: PaymentEngine::new(store.clone(), gateway, options),
            refunds: RefundEngine::new(store),
        }
    }
}
