use std::sync::Arc;

use tradegate_infra::engine::payment::PaymentOptions;
use tradegate_infra::gateway::{MockGateway, RazorpayGateway};
use tradegate_infra::{Config, MarketStore, MemoryStore, PostgresStore, SettlementPoller};
use tradegate_payments::PaymentGatewayClient;

#[tokio::main]
async fn main() {
    tradegate_observability::init();

    let config = Config::from_env();

    let store: Arc<dyn MarketStore> = match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url)
                .await
                .expect("failed to connect to database");
            tracing::info!("using Postgres store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (state is not persisted)");
            Arc::new(MemoryStore::new())
        }
    };

    let gateway: Arc<dyn PaymentGatewayClient> = match &config.gateway_key_id {
        Some(key_id) => Arc::new(RazorpayGateway::new(key_id, &config.gateway_key_secret)),
        None => {
            tracing::warn!("RAZORPAY_KEY_ID not set; using mock payment gateway");
            Arc::new(MockGateway::new(config.gateway_key_secret.clone()))
        }
    };

    let poller_handle = if config.settlement.enabled {
        Some(
            SettlementPoller::new(store.clone(), gateway.clone(), config.settlement.clone()).spawn(),
        )
    } else {
        tracing::info!("refund settlement poller disabled");
        None
    };

    let services = tradegate_api::app::AppServices::new(
        store,
        gateway,
        PaymentOptions {
            currency: config.currency.clone(),
            receipt_prefix: config.receipt_prefix.clone(),
        },
    );
    let app = tradegate_api::app::build_app(config.jwt_secret.clone(), services);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {e}", config.bind_addr));

    tracing::info!("listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("server error");

    if let Some(handle) = poller_handle {
        handle.shutdown().await;
    }
}
