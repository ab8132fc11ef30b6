//! Black-box HTTP tests: spawn the real router on an ephemeral port and talk
//! to it with minted JWTs, asserting the status-code and error-code contract.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

use tradegate_auth::{JwtClaims, Role};
use tradegate_catalog::Product;
use tradegate_core::{AddressId, AuditStamp, ProductId, UserId};
use tradegate_infra::engine::payment::PaymentOptions;
use tradegate_infra::gateway::MockGateway;
use tradegate_infra::store::Address;
use tradegate_infra::{MarketStore, MemoryStore};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    store: Arc<MemoryStore>,
    gateway: Arc<MockGateway>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(MockGateway::new("test-gateway-secret"));

        let market: Arc<dyn MarketStore> = store.clone();
        let services = tradegate_api::app::AppServices::new(
            market,
            gateway.clone(),
            PaymentOptions::default(),
        );
        let app = tradegate_api::app::build_app(JWT_SECRET.to_string(), services);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            store,
            gateway,
            handle,
        }
    }

    async fn seed_address(&self, owner: UserId) -> AddressId {
        let address = Address {
            id: AddressId::new(),
            owner_id: owner,
            name: "Acme Stores".to_string(),
            phone: "9876543210".to_string(),
            line1: "12 Market Road".to_string(),
            city: "Pune".to_string(),
            state: "MH".to_string(),
            pincode: "411001".to_string(),
            audit: AuditStamp::on_create(Some(owner), Utc::now()),
        };
        let mut tx = self.store.begin().await.unwrap();
        tx.insert_address(&address).await.unwrap();
        tx.commit().await.unwrap();
        address.id
    }

    async fn seed_product(&self, seller: UserId, stock: i64, unit_price: u64) -> ProductId {
        let product = Product {
            id: ProductId::new(),
            seller_id: seller,
            name: "Widget".to_string(),
            unit_price,
            stock,
            active: true,
            audit: AuditStamp::on_create(Some(seller), Utc::now()),
        };
        let mut tx = self.store.begin().await.unwrap();
        tx.insert_product(&product).await.unwrap();
        tx.commit().await.unwrap();
        product.id
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(user_id: UserId, role: Role) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: user_id,
        role,
        iat: now.timestamp() - 10,
        exp: now.timestamp() + 600,
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

/// Place an order over HTTP and return its id.
async fn place_order(
    client: &reqwest::Client,
    srv: &TestServer,
    buyer_token: &str,
    address_id: AddressId,
    product_id: ProductId,
    quantity: i64,
) -> String {
    let res = client
        .post(format!("{}/orders", srv.base_url))
        .bearer_auth(buyer_token)
        .json(&json!({
            "address_id": address_id,
            "items": [{"product_id": product_id, "quantity": quantity}],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    body["order_id"].as_str().unwrap().to_string()
}

/// Run the two payment phases with a validly minted signature.
async fn pay_order(client: &reqwest::Client, srv: &TestServer, buyer_token: &str, order_id: &str) {
    let res = client
        .post(format!("{}/payments/order", srv.base_url))
        .bearer_auth(buyer_token)
        .json(&json!({"order_id": order_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    let gateway_order_id = body["gateway_order_id"].as_str().unwrap().to_string();

    let gateway_payment_id = format!("pay_{order_id}");
    let signature = srv.gateway.sign(&gateway_order_id, &gateway_payment_id);
    let res = client
        .post(format!("{}/payments/verify", srv.base_url))
        .bearer_auth(buyer_token)
        .json(&json!({
            "order_id": order_id,
            "gateway_order_id": gateway_order_id,
            "gateway_payment_id": gateway_payment_id,
            "signature": signature,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/orders", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Health stays public.
    let res = client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn placing_an_order_returns_id_and_total() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let buyer = UserId::new();
    let seller = UserId::new();
    let token = mint_jwt(buyer, Role::Retailer);
    let address_id = srv.seed_address(buyer).await;
    let product_id = srv.seed_product(seller, 10, 2_500).await;

    let res = client
        .post(format!("{}/orders", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "address_id": address_id,
            "items": [{"product_id": product_id, "quantity": 2}],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["total_amount"], 5_000);

    // Stock moved with the placement.
    let snapshot = srv.store.snapshot().await;
    assert_eq!(snapshot.products[0].stock, 8);
}

#[tokio::test]
async fn sellers_cannot_place_orders() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let seller = UserId::new();
    let token = mint_jwt(seller, Role::Manufacturer);
    let address_id = srv.seed_address(seller).await;
    let product_id = srv.seed_product(seller, 10, 100).await;

    let res = client
        .post(format!("{}/orders", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "address_id": address_id,
            "items": [{"product_id": product_id, "quantity": 1}],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "ORDER_ACCESS_DENIED");
}

#[tokio::test]
async fn insufficient_stock_is_a_bad_request() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let buyer = UserId::new();
    let token = mint_jwt(buyer, Role::Retailer);
    let address_id = srv.seed_address(buyer).await;
    let product_id = srv.seed_product(UserId::new(), 1, 100).await;

    let res = client
        .post(format!("{}/orders", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "address_id": address_id,
            "items": [{"product_id": product_id, "quantity": 5}],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "INSUFFICIENT_STOCK");
}

#[tokio::test]
async fn payment_flow_confirms_order_and_issues_invoice() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let buyer = UserId::new();
    let seller = UserId::new();
    let buyer_token = mint_jwt(buyer, Role::Retailer);
    let address_id = srv.seed_address(buyer).await;
    let product_id = srv.seed_product(seller, 10, 1_000).await;

    let order_id = place_order(&client, &srv, &buyer_token, address_id, product_id, 2).await;
    pay_order(&client, &srv, &buyer_token, &order_id).await;

    let res = client
        .get(format!("{}/orders/{order_id}", srv.base_url))
        .bearer_auth(&buyer_token)
        .send()
        .await
        .unwrap();
    let order: serde_json::Value = res.json().await.unwrap();
    assert_eq!(order["status"], "CONFIRMED");

    let res = client
        .get(format!("{}/orders/{order_id}/invoice", srv.base_url))
        .bearer_auth(&buyer_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let invoice: serde_json::Value = res.json().await.unwrap();
    assert_eq!(invoice["status"], "GENERATED");
    assert_eq!(invoice["amount"], 2_000);
}

#[tokio::test]
async fn invalid_signature_fails_verification_and_marks_payment_failed() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let buyer = UserId::new();
    let buyer_token = mint_jwt(buyer, Role::Retailer);
    let address_id = srv.seed_address(buyer).await;
    let product_id = srv.seed_product(UserId::new(), 10, 1_000).await;

    let order_id = place_order(&client, &srv, &buyer_token, address_id, product_id, 1).await;

    let res = client
        .post(format!("{}/payments/order", srv.base_url))
        .bearer_auth(&buyer_token)
        .json(&json!({"order_id": order_id}))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    let gateway_order_id = body["gateway_order_id"].as_str().unwrap();

    let res = client
        .post(format!("{}/payments/verify", srv.base_url))
        .bearer_auth(&buyer_token)
        .json(&json!({
            "order_id": order_id,
            "gateway_order_id": gateway_order_id,
            "gateway_payment_id": "pay_x",
            "signature": "deadbeef",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "INVALID_PAYMENT_SIGNATURE");

    let res = client
        .get(format!("{}/orders/{order_id}/payment", srv.base_url))
        .bearer_auth(&buyer_token)
        .send()
        .await
        .unwrap();
    let payment: serde_json::Value = res.json().await.unwrap();
    assert_eq!(payment["status"], "FAILED");
}

#[tokio::test]
async fn seller_reject_creates_processing_refund() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let buyer = UserId::new();
    let seller = UserId::new();
    let buyer_token = mint_jwt(buyer, Role::Retailer);
    let seller_token = mint_jwt(seller, Role::Manufacturer);
    let address_id = srv.seed_address(buyer).await;
    let product_id = srv.seed_product(seller, 10, 1_000).await;

    let order_id = place_order(&client, &srv, &buyer_token, address_id, product_id, 1).await;
    pay_order(&client, &srv, &buyer_token, &order_id).await;

    let res = client
        .post(format!("{}/orders/{order_id}/reject", srv.base_url))
        .bearer_auth(&seller_token)
        .json(&json!({"reason": "out of capacity"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/orders/{order_id}/refund", srv.base_url))
        .bearer_auth(&buyer_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let refund: serde_json::Value = res.json().await.unwrap();
    assert_eq!(refund["status"], "PROCESSING");
    assert_eq!(refund["initiated_by"], "SYSTEM");

    let res = client
        .get(format!("{}/orders/{order_id}/payment", srv.base_url))
        .bearer_auth(&seller_token)
        .send()
        .await
        .unwrap();
    let payment: serde_json::Value = res.json().await.unwrap();
    assert_eq!(payment["status"], "REFUND_PENDING");
}

#[tokio::test]
async fn buyer_cancel_then_seller_approval_via_http() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let buyer = UserId::new();
    let seller = UserId::new();
    let buyer_token = mint_jwt(buyer, Role::Retailer);
    let seller_token = mint_jwt(seller, Role::Manufacturer);
    let address_id = srv.seed_address(buyer).await;
    let product_id = srv.seed_product(seller, 10, 1_000).await;

    let order_id = place_order(&client, &srv, &buyer_token, address_id, product_id, 2).await;
    pay_order(&client, &srv, &buyer_token, &order_id).await;

    let res = client
        .post(format!("{}/orders/{order_id}/cancel", srv.base_url))
        .bearer_auth(&buyer_token)
        .json(&json!({"reason": "no longer needed"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/orders/{order_id}/refund", srv.base_url))
        .bearer_auth(&seller_token)
        .send()
        .await
        .unwrap();
    let refund: serde_json::Value = res.json().await.unwrap();
    assert_eq!(refund["status"], "PENDING_APPROVAL");
    assert_eq!(refund["initiated_by"], "RETAILER");

    let res = client
        .post(format!("{}/orders/{order_id}/refund/approve", srv.base_url))
        .bearer_auth(&seller_token)
        .json(&json!({"note": "approved"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let refund: serde_json::Value = res.json().await.unwrap();
    assert_eq!(refund["status"], "PROCESSING");

    // Stock restored by the cancellation.
    let snapshot = srv.store.snapshot().await;
    assert_eq!(snapshot.products[0].stock, 10);
}

#[tokio::test]
async fn non_participants_get_403_on_reads() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let buyer = UserId::new();
    let buyer_token = mint_jwt(buyer, Role::Retailer);
    let outsider_token = mint_jwt(UserId::new(), Role::Retailer);
    let address_id = srv.seed_address(buyer).await;
    let product_id = srv.seed_product(UserId::new(), 10, 1_000).await;

    let order_id = place_order(&client, &srv, &buyer_token, address_id, product_id, 1).await;
    pay_order(&client, &srv, &buyer_token, &order_id).await;

    for path in ["", "/payment", "/events", "/invoice"] {
        let res = client
            .get(format!("{}/orders/{order_id}{path}", srv.base_url))
            .bearer_auth(&outsider_token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN, "path {path:?}");
    }
}

#[tokio::test]
async fn illegal_status_updates_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let buyer = UserId::new();
    let seller = UserId::new();
    let buyer_token = mint_jwt(buyer, Role::Retailer);
    let seller_token = mint_jwt(seller, Role::Manufacturer);
    let address_id = srv.seed_address(buyer).await;
    let product_id = srv.seed_product(seller, 10, 1_000).await;

    let order_id = place_order(&client, &srv, &buyer_token, address_id, product_id, 1).await;

    // CREATED cannot jump to SHIPPED.
    let res = client
        .put(format!("{}/orders/{order_id}/status", srv.base_url))
        .bearer_auth(&seller_token)
        .json(&json!({"status": "SHIPPED"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Shipment requires ACCEPTED.
    let res = client
        .post(format!("{}/orders/{order_id}/shipment", srv.base_url))
        .bearer_auth(&seller_token)
        .json(&json!({"carrier": "BlueDart", "tracking_number": "BD-1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Unknown status strings are a validation failure.
    let res = client
        .put(format!("{}/orders/{order_id}/status", srv.base_url))
        .bearer_auth(&seller_token)
        .json(&json!({"status": "TELEPORTED"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_order_is_404() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = mint_jwt(UserId::new(), Role::Retailer);

    let res = client
        .get(format!("{}/orders/{}", srv.base_url, UserId::new()))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "RESOURCE_NOT_FOUND");
}
