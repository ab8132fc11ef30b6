//! End-to-end engine tests against the in-memory store.
//!
//! These drive the full lifecycle: placement → payment → verification →
//! seller decisions → cancellation/refund → settlement sweep, and assert the
//! stock/payment/invoice/refund invariants hold along the way.

use std::sync::Arc;

use chrono::{Duration, Utc};

use tradegate_auth::Actor;
use tradegate_catalog::Product;
use tradegate_core::{AddressId, AuditStamp, DomainError, OrderId, ProductId, UserId};
use tradegate_invoicing::InvoiceStatus;
use tradegate_orders::{OrderEventType, OrderStatus};
use tradegate_payments::PaymentStatus;
use tradegate_refunds::{RefundInitiatedBy, RefundStatus};

use crate::engine::order::{PlaceOrderItem, PlaceOrderRequest};
use crate::engine::payment::{PaymentOptions, VerifyPaymentRequest};
use crate::engine::settlement::{SettlementConfig, SettlementPoller};
use crate::engine::{EngineError, OrderEngine, PaymentEngine, RefundEngine};
use crate::gateway::MockGateway;
use crate::store::{Address, MarketStore, MemoryStore};

struct Harness {
    store: Arc<MemoryStore>,
    gateway: Arc<MockGateway>,
    orders: OrderEngine,
    payments: PaymentEngine,
    refunds: RefundEngine,
    poller: SettlementPoller,
    buyer: Actor,
    seller: Actor,
    address_id: AddressId,
}

async fn setup() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(MockGateway::new("test-gateway-secret"));

    let buyer = Actor::retailer(UserId::new());
    let seller = Actor::manufacturer(UserId::new());

    let address_id = AddressId::new();
    let address = Address {
        id: address_id,
        owner_id: buyer.user_id,
        name: "Acme Stores".to_string(),
        phone: "9876543210".to_string(),
        line1: "12 Market Road".to_string(),
        city: "Pune".to_string(),
        state: "MH".to_string(),
        pincode: "411001".to_string(),
        audit: AuditStamp::on_create(Some(buyer.user_id), Utc::now()),
    };
    let mut tx = store.begin().await.unwrap();
    tx.insert_address(&address).await.unwrap();
    tx.commit().await.unwrap();

    let market: Arc<dyn MarketStore> = store.clone();
    let orders = OrderEngine::new(market.clone());
    let payments = PaymentEngine::new(market.clone(), gateway.clone(), PaymentOptions::default());
    let refunds = RefundEngine::new(market.clone());
    let poller = SettlementPoller::new(
        market,
        gateway.clone(),
        SettlementConfig {
            enabled: true,
            ..SettlementConfig::default()
        },
    );

    Harness {
        store,
        gateway,
        orders,
        payments,
        refunds,
        poller,
        buyer,
        seller,
        address_id,
    }
}

impl Harness {
    async fn seed_product(&self, stock: i64, unit_price: u64) -> ProductId {
        self.seed_product_for(self.seller.user_id, stock, unit_price).await
    }

    async fn seed_product_for(&self, seller: UserId, stock: i64, unit_price: u64) -> ProductId {
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

    async fn place(&self, product_id: ProductId, quantity: i64) -> OrderId {
        self.orders
            .place_order(
                &self.buyer,
                PlaceOrderRequest {
                    address_id: self.address_id,
                    items: vec![PlaceOrderItem { product_id, quantity }],
                },
            )
            .await
            .unwrap()
            .order_id
    }

    /// Create the gateway order and verify with a validly minted signature.
    async fn pay(&self, order_id: OrderId) {
        let outcome = self
            .payments
            .create_gateway_order(&self.buyer, order_id)
            .await
            .unwrap();
        let gateway_order_id = outcome.gateway_order_id.unwrap();
        let gateway_payment_id = format!("pay_{order_id}");
        let signature = self.gateway.sign(&gateway_order_id, &gateway_payment_id);
        self.payments
            .verify_payment(
                &self.buyer,
                VerifyPaymentRequest {
                    order_id,
                    gateway_order_id,
                    gateway_payment_id,
                    signature,
                },
            )
            .await
            .unwrap();
    }

    async fn stock_of(&self, product_id: ProductId) -> i64 {
        self.store
            .snapshot()
            .await
            .products
            .iter()
            .find(|p| p.id == product_id)
            .unwrap()
            .stock
    }
}

fn domain_err(err: EngineError) -> DomainError {
    match err {
        EngineError::Domain(e) => e,
        other => panic!("expected domain error, got {other:?}"),
    }
}

#[tokio::test]
async fn placement_decrements_stock_and_snapshots_total() {
    let h = setup().await;
    let product_id = h.seed_product(10, 2_500).await;

    let placed = h
        .orders
        .place_order(
            &h.buyer,
            PlaceOrderRequest {
                address_id: h.address_id,
                items: vec![PlaceOrderItem { product_id, quantity: 2 }],
            },
        )
        .await
        .unwrap();

    assert_eq!(placed.total_amount, 5_000);
    assert_eq!(h.stock_of(product_id).await, 8);

    let order = h.orders.get_order(&h.buyer, placed.order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Created);
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].unit_price, 2_500);
    assert_eq!(order.delivery.city, "Pune");
}

#[tokio::test]
async fn placement_beyond_stock_fails_and_stock_is_unchanged() {
    let h = setup().await;
    let product_id = h.seed_product(2, 1_000).await;

    let err = h
        .orders
        .place_order(
            &h.buyer,
            PlaceOrderRequest {
                address_id: h.address_id,
                items: vec![PlaceOrderItem { product_id, quantity: 5 }],
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(domain_err(err), DomainError::InsufficientStock { .. }));
    assert_eq!(h.stock_of(product_id).await, 2);
    assert!(h.store.snapshot().await.orders.is_empty());
}

#[tokio::test]
async fn mixed_seller_order_is_rejected_before_any_stock_moves() {
    let h = setup().await;
    let first = h.seed_product(10, 1_000).await;
    let second = h.seed_product_for(UserId::new(), 10, 1_000).await;

    let err = h
        .orders
        .place_order(
            &h.buyer,
            PlaceOrderRequest {
                address_id: h.address_id,
                items: vec![
                    PlaceOrderItem { product_id: first, quantity: 1 },
                    PlaceOrderItem { product_id: second, quantity: 1 },
                ],
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(domain_err(err), DomainError::InvalidTransition(_)));
    assert_eq!(h.stock_of(first).await, 10);
    assert_eq!(h.stock_of(second).await, 10);
}

#[tokio::test]
async fn unknown_or_foreign_address_is_not_found() {
    let h = setup().await;
    let product_id = h.seed_product(10, 1_000).await;

    let err = h
        .orders
        .place_order(
            &h.buyer,
            PlaceOrderRequest {
                address_id: AddressId::new(),
                items: vec![PlaceOrderItem { product_id, quantity: 1 }],
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(domain_err(err), DomainError::NotFound { resource: "Address" }));
}

#[tokio::test]
async fn inactive_product_is_not_found() {
    let h = setup().await;
    let product = Product {
        id: ProductId::new(),
        seller_id: h.seller.user_id,
        name: "Retired".to_string(),
        unit_price: 100,
        stock: 10,
        active: false,
        audit: AuditStamp::on_create(None, Utc::now()),
    };
    let mut tx = h.store.begin().await.unwrap();
    tx.insert_product(&product).await.unwrap();
    tx.commit().await.unwrap();

    let err = h
        .orders
        .place_order(
            &h.buyer,
            PlaceOrderRequest {
                address_id: h.address_id,
                items: vec![PlaceOrderItem { product_id: product.id, quantity: 1 }],
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(domain_err(err), DomainError::NotFound { resource: "Product" }));
}

/// The full seller-reject scenario: pay, confirm, reject, settle.
#[tokio::test]
async fn seller_reject_flows_through_auto_refund_and_settlement() {
    let h = setup().await;
    let product_id = h.seed_product(10, 2_500).await;
    let order_id = h.place(product_id, 2).await;
    assert_eq!(h.stock_of(product_id).await, 8);

    // Phase 1: gateway order + INITIATED payment.
    let outcome = h.payments.create_gateway_order(&h.buyer, order_id).await.unwrap();
    let gateway_order_id = outcome.gateway_order_id.clone().unwrap();
    {
        let payment = h.payments.get_payment(&h.buyer, order_id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Initiated);
        assert_eq!(payment.gateway_order_id.as_deref(), Some(gateway_order_id.as_str()));
        assert_eq!(payment.amount, 5_000);
    }

    // Phase 2: verified checkout confirms the order and issues the invoice.
    let gateway_payment_id = "pay_real".to_string();
    let signature = h.gateway.sign(&gateway_order_id, &gateway_payment_id);
    h.payments
        .verify_payment(
            &h.buyer,
            VerifyPaymentRequest {
                order_id,
                gateway_order_id,
                gateway_payment_id,
                signature,
            },
        )
        .await
        .unwrap();

    let order = h.orders.get_order(&h.buyer, order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Confirmed);
    let invoice = h.payments.get_invoice(&h.buyer, order_id).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Generated);
    assert_eq!(invoice.amount, 5_000);

    // Seller rejects the paid order: refund goes straight to PROCESSING.
    h.orders
        .reject_order(&h.seller, order_id, Some("out of capacity".to_string()))
        .await
        .unwrap();

    let order = h.orders.get_order(&h.buyer, order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Rejected);
    let refund = h.refunds.get_refund(&h.buyer, order_id).await.unwrap();
    assert_eq!(refund.status, RefundStatus::Processing);
    assert_eq!(refund.initiated_by, RefundInitiatedBy::System);
    let payment = h.payments.get_payment(&h.buyer, order_id).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::RefundPending);
    let invoice = h.payments.get_invoice(&h.buyer, order_id).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Cancelled);

    // Before the threshold the sweep must not touch it.
    let settled = h.poller.sweep_once(Utc::now()).await.unwrap();
    assert_eq!(settled, 0);
    let refund = h.refunds.get_refund(&h.buyer, order_id).await.unwrap();
    assert_eq!(refund.status, RefundStatus::Processing);

    // Six minutes later the sweep settles it.
    let settled = h.poller.sweep_once(Utc::now() + Duration::minutes(6)).await.unwrap();
    assert_eq!(settled, 1);
    let refund = h.refunds.get_refund(&h.buyer, order_id).await.unwrap();
    assert_eq!(refund.status, RefundStatus::Processed);
    assert!(refund.processed_at.is_some());
    assert!(refund.refund_reference.is_some());
    let payment = h.payments.get_payment(&h.buyer, order_id).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Refunded);

    // Audit trail recorded every step, in order.
    let events = h.orders.order_events(&h.buyer, order_id).await.unwrap();
    let kinds: Vec<OrderEventType> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(
        kinds,
        vec![
            OrderEventType::OrderPlaced,
            OrderEventType::PaymentCreated,
            OrderEventType::StatusChanged,
            OrderEventType::InvoiceGenerated,
            OrderEventType::StatusChanged,
            OrderEventType::RefundProcessing,
            OrderEventType::RefundProcessed,
        ]
    );
}

/// The buyer-cancel scenario: refund waits for approval, then settles.
#[tokio::test]
async fn buyer_cancellation_requires_seller_approval_before_settlement() {
    let h = setup().await;
    let product_id = h.seed_product(10, 1_000).await;
    let order_id = h.place(product_id, 3).await;
    h.pay(order_id).await;
    assert_eq!(h.stock_of(product_id).await, 7);

    h.orders
        .cancel_order(&h.buyer, order_id, Some("no longer needed".to_string()))
        .await
        .unwrap();

    let order = h.orders.get_order(&h.buyer, order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(h.stock_of(product_id).await, 10);

    // Money stays captured until the seller decides.
    let refund = h.refunds.get_refund(&h.buyer, order_id).await.unwrap();
    assert_eq!(refund.status, RefundStatus::PendingApproval);
    assert_eq!(refund.initiated_by, RefundInitiatedBy::Retailer);
    let payment = h.payments.get_payment(&h.buyer, order_id).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Success);

    let refund = h
        .refunds
        .approve_refund(&h.seller, order_id, Some("approved".to_string()))
        .await
        .unwrap();
    assert_eq!(refund.status, RefundStatus::Processing);
    let payment = h.payments.get_payment(&h.buyer, order_id).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::RefundPending);
    let invoice = h.payments.get_invoice(&h.buyer, order_id).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Cancelled);

    let settled = h.poller.sweep_once(Utc::now() + Duration::minutes(6)).await.unwrap();
    assert_eq!(settled, 1);
    let refund = h.refunds.get_refund(&h.buyer, order_id).await.unwrap();
    assert_eq!(refund.status, RefundStatus::Processed);
    let payment = h.payments.get_payment(&h.buyer, order_id).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Refunded);
}

#[tokio::test]
async fn cancelling_an_unpaid_order_restocks_without_a_refund() {
    let h = setup().await;
    let product_id = h.seed_product(5, 1_000).await;
    let order_id = h.place(product_id, 4).await;
    assert_eq!(h.stock_of(product_id).await, 1);

    h.orders.cancel_order(&h.buyer, order_id, None).await.unwrap();
    assert_eq!(h.stock_of(product_id).await, 5);
    assert!(h.store.snapshot().await.refunds.is_empty());

    // A second attempt fails and must not restock again.
    let err = h.orders.cancel_order(&h.buyer, order_id, None).await.unwrap_err();
    assert!(matches!(domain_err(err), DomainError::InvalidTransition(_)));
    assert_eq!(h.stock_of(product_id).await, 5);
}

#[tokio::test]
async fn seller_cannot_cancel_before_payment() {
    let h = setup().await;
    let product_id = h.seed_product(5, 1_000).await;
    let order_id = h.place(product_id, 1).await;

    let err = h.orders.cancel_order(&h.seller, order_id, None).await.unwrap_err();
    assert!(matches!(domain_err(err), DomainError::InvalidTransition(_)));
}

#[tokio::test]
async fn seller_cancellation_of_paid_order_refunds_automatically() {
    let h = setup().await;
    let product_id = h.seed_product(5, 1_000).await;
    let order_id = h.place(product_id, 1).await;
    h.pay(order_id).await;

    h.orders
        .cancel_order(&h.seller, order_id, Some("cannot fulfill".to_string()))
        .await
        .unwrap();

    let refund = h.refunds.get_refund(&h.seller, order_id).await.unwrap();
    assert_eq!(refund.status, RefundStatus::Processing);
    assert_eq!(refund.initiated_by, RefundInitiatedBy::System);
    let payment = h.payments.get_payment(&h.seller, order_id).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::RefundPending);
    assert_eq!(h.stock_of(product_id).await, 5);
}

#[tokio::test]
async fn concurrent_checkout_calls_share_one_payment_row() {
    let h = setup().await;
    let product_id = h.seed_product(10, 1_000).await;
    let order_id = h.place(product_id, 1).await;

    let (first, second) = tokio::join!(
        h.payments.create_gateway_order(&h.buyer, order_id),
        h.payments.create_gateway_order(&h.buyer, order_id),
    );
    let first = first.unwrap();
    let second = second.unwrap();

    assert!(first.gateway_order_id.is_some());
    assert_eq!(first.gateway_order_id, second.gateway_order_id);
    assert_eq!(h.store.snapshot().await.payments.len(), 1);
}

#[tokio::test]
async fn concurrent_cancel_and_reject_produce_one_refund() {
    let h = setup().await;
    let product_id = h.seed_product(10, 1_000).await;
    let order_id = h.place(product_id, 1).await;
    h.pay(order_id).await;

    let (cancel, reject) = tokio::join!(
        h.orders.cancel_order(&h.buyer, order_id, None),
        h.orders.reject_order(&h.seller, order_id, None),
    );
    // Exactly one side wins the terminal transition.
    assert!(cancel.is_ok() ^ reject.is_ok());
    assert_eq!(h.store.snapshot().await.refunds.len(), 1);
}

#[tokio::test]
async fn bad_signature_marks_payment_failed_then_retry_succeeds() {
    let h = setup().await;
    let product_id = h.seed_product(10, 1_000).await;
    let order_id = h.place(product_id, 1).await;

    let outcome = h.payments.create_gateway_order(&h.buyer, order_id).await.unwrap();
    let gateway_order_id = outcome.gateway_order_id.unwrap();

    let err = h
        .payments
        .verify_payment(
            &h.buyer,
            VerifyPaymentRequest {
                order_id,
                gateway_order_id: gateway_order_id.clone(),
                gateway_payment_id: "pay_x".to_string(),
                signature: "deadbeef".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(domain_err(err), DomainError::InvalidSignature));
    let payment = h.payments.get_payment(&h.buyer, order_id).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Failed);
    // The failed attempt must not confirm or invoice.
    let order = h.orders.get_order(&h.buyer, order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Created);

    let signature = h.gateway.sign(&gateway_order_id, "pay_x");
    h.payments
        .verify_payment(
            &h.buyer,
            VerifyPaymentRequest {
                order_id,
                gateway_order_id,
                gateway_payment_id: "pay_x".to_string(),
                signature,
            },
        )
        .await
        .unwrap();
    let payment = h.payments.get_payment(&h.buyer, order_id).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Success);
}

#[tokio::test]
async fn mismatched_gateway_order_id_is_a_signature_failure() {
    let h = setup().await;
    let product_id = h.seed_product(10, 1_000).await;
    let order_id = h.place(product_id, 1).await;
    h.payments.create_gateway_order(&h.buyer, order_id).await.unwrap();

    let err = h
        .payments
        .verify_payment(
            &h.buyer,
            VerifyPaymentRequest {
                order_id,
                gateway_order_id: "order_someone_elses".to_string(),
                gateway_payment_id: "pay_x".to_string(),
                signature: "00".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(domain_err(err), DomainError::InvalidSignature));
}

#[tokio::test]
async fn verify_replay_is_idempotent_and_keeps_one_invoice() {
    let h = setup().await;
    let product_id = h.seed_product(10, 1_000).await;
    let order_id = h.place(product_id, 1).await;

    let outcome = h.payments.create_gateway_order(&h.buyer, order_id).await.unwrap();
    let gateway_order_id = outcome.gateway_order_id.unwrap();
    let signature = h.gateway.sign(&gateway_order_id, "pay_1");
    let request = VerifyPaymentRequest {
        order_id,
        gateway_order_id,
        gateway_payment_id: "pay_1".to_string(),
        signature,
    };

    h.payments.verify_payment(&h.buyer, request.clone()).await.unwrap();
    h.payments.verify_payment(&h.buyer, request).await.unwrap();

    let snapshot = h.store.snapshot().await;
    assert_eq!(snapshot.invoices.len(), 1);
    assert_eq!(snapshot.payments.len(), 1);

    // Replaying phase 1 after success creates no new gateway order either.
    let replay = h.payments.create_gateway_order(&h.buyer, order_id).await.unwrap();
    assert!(replay.gateway_order_id.is_some());
    assert_eq!(h.store.snapshot().await.payments.len(), 1);
}

#[tokio::test]
async fn payment_against_a_non_payable_order_is_invalid_status() {
    let h = setup().await;
    let product_id = h.seed_product(10, 1_000).await;
    let order_id = h.place(product_id, 1).await;

    // No payment row yet and the order has left CREATED.
    h.orders.cancel_order(&h.buyer, order_id, None).await.unwrap();

    let err = h.payments.create_gateway_order(&h.buyer, order_id).await.unwrap_err();
    assert!(matches!(domain_err(err), DomainError::InvalidOrderStatus { .. }));
    assert!(h.store.snapshot().await.payments.is_empty());
}

#[tokio::test]
async fn refund_rejection_keeps_the_charge() {
    let h = setup().await;
    let product_id = h.seed_product(10, 1_000).await;
    let order_id = h.place(product_id, 1).await;
    h.pay(order_id).await;
    h.orders.cancel_order(&h.buyer, order_id, None).await.unwrap();

    let refund = h
        .refunds
        .reject_refund(&h.seller, order_id, Some("outside return window".to_string()))
        .await
        .unwrap();
    assert_eq!(refund.status, RefundStatus::Rejected);
    assert_eq!(refund.seller_note.as_deref(), Some("outside return window"));

    let payment = h.payments.get_payment(&h.buyer, order_id).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Success);

    // Idempotent: rejecting again returns the same terminal state.
    let again = h.refunds.reject_refund(&h.seller, order_id, None).await.unwrap();
    assert_eq!(again.status, RefundStatus::Rejected);

    // The sweep never touches a rejected refund.
    let settled = h.poller.sweep_once(Utc::now() + Duration::minutes(10)).await.unwrap();
    assert_eq!(settled, 0);
}

#[tokio::test]
async fn approve_refund_is_idempotent_once_processing() {
    let h = setup().await;
    let product_id = h.seed_product(10, 1_000).await;
    let order_id = h.place(product_id, 1).await;
    h.pay(order_id).await;
    h.orders.cancel_order(&h.buyer, order_id, None).await.unwrap();

    let first = h.refunds.approve_refund(&h.seller, order_id, None).await.unwrap();
    assert_eq!(first.status, RefundStatus::Processing);
    let second = h.refunds.approve_refund(&h.seller, order_id, None).await.unwrap();
    assert_eq!(second.status, RefundStatus::Processing);

    // No duplicate audit events from the replay.
    let events = h.orders.order_events(&h.seller, order_id).await.unwrap();
    let approvals = events
        .iter()
        .filter(|e| e.event_type == OrderEventType::RefundApproved)
        .count();
    assert_eq!(approvals, 1);
}

#[tokio::test]
async fn gateway_refund_failure_keeps_refund_processing_until_next_sweep() {
    let h = setup().await;
    let product_id = h.seed_product(10, 1_000).await;
    let order_id = h.place(product_id, 1).await;
    h.pay(order_id).await;
    h.orders.reject_order(&h.seller, order_id, None).await.unwrap();

    h.gateway.set_fail_refunds(true);
    let settled = h.poller.sweep_once(Utc::now() + Duration::minutes(6)).await.unwrap();
    assert_eq!(settled, 0);

    let payment = h.payments.get_payment(&h.buyer, order_id).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::RefundFailed);
    let refund = h.refunds.get_refund(&h.buyer, order_id).await.unwrap();
    assert_eq!(refund.status, RefundStatus::Processing);

    // Next sweep finalizes the refund; the payment keeps its failure marker.
    let settled = h.poller.sweep_once(Utc::now() + Duration::minutes(8)).await.unwrap();
    assert_eq!(settled, 1);
    let refund = h.refunds.get_refund(&h.buyer, order_id).await.unwrap();
    assert_eq!(refund.status, RefundStatus::Processed);
    let payment = h.payments.get_payment(&h.buyer, order_id).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::RefundFailed);
}

#[tokio::test]
async fn fulfillment_flow_accept_ship_deliver() {
    let h = setup().await;
    let product_id = h.seed_product(10, 1_000).await;
    let order_id = h.place(product_id, 1).await;
    h.pay(order_id).await;

    h.orders.accept_order(&h.seller, order_id).await.unwrap();
    h.orders
        .create_shipment(
            &h.seller,
            order_id,
            "BlueDart".to_string(),
            "BD-42".to_string(),
            Some("https://track.example/BD-42".to_string()),
        )
        .await
        .unwrap();
    h.orders.mark_delivered(&h.seller, order_id).await.unwrap();

    let order = h.orders.get_order(&h.seller, order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
    let shipment = order.shipment.unwrap();
    assert_eq!(shipment.carrier, "BlueDart");
    assert!(order.delivered_at.is_some());

    // Shipment details land in the audit note for quick scanning.
    let events = h.orders.order_events(&h.seller, order_id).await.unwrap();
    assert!(events
        .iter()
        .any(|e| e.note.as_deref().is_some_and(|n| n.contains("BD-42"))));
}

#[tokio::test]
async fn generic_status_update_enforces_the_graph() {
    let h = setup().await;
    let product_id = h.seed_product(10, 1_000).await;
    let order_id = h.place(product_id, 1).await;

    // CREATED order cannot jump to SHIPPED.
    let err = h
        .orders
        .update_status(&h.seller, order_id, OrderStatus::Shipped)
        .await
        .unwrap_err();
    assert!(matches!(domain_err(err), DomainError::InvalidTransition(_)));
    let order = h.orders.get_order(&h.seller, order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Created);

    // CONFIRMED/CANCELLED are not seller-settable at all.
    let err = h
        .orders
        .update_status(&h.seller, order_id, OrderStatus::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(domain_err(err), DomainError::InvalidTransition(_)));

    // Rejecting through the generic endpoint still refunds a paid order.
    h.pay(order_id).await;
    h.orders
        .update_status(&h.seller, order_id, OrderStatus::Rejected)
        .await
        .unwrap();
    let refund = h.refunds.get_refund(&h.seller, order_id).await.unwrap();
    assert_eq!(refund.status, RefundStatus::Processing);
}

#[tokio::test]
async fn reads_are_participant_only() {
    let h = setup().await;
    let product_id = h.seed_product(10, 1_000).await;
    let order_id = h.place(product_id, 1).await;
    h.pay(order_id).await;

    let outsider = Actor::retailer(UserId::new());
    for err in [
        h.payments.get_payment(&outsider, order_id).await.unwrap_err(),
        h.payments.get_invoice(&outsider, order_id).await.unwrap_err(),
        h.orders.get_order(&outsider, order_id).await.unwrap_err(),
        h.orders.order_events(&outsider, order_id).await.unwrap_err(),
    ] {
        assert!(matches!(domain_err(err), DomainError::Unauthorized));
    }
}

#[tokio::test]
async fn fulfillment_operations_require_the_owning_seller() {
    let h = setup().await;
    let product_id = h.seed_product(10, 1_000).await;
    let order_id = h.place(product_id, 1).await;
    h.pay(order_id).await;

    let other_seller = Actor::manufacturer(UserId::new());
    let err = h.orders.accept_order(&other_seller, order_id).await.unwrap_err();
    assert!(matches!(domain_err(err), DomainError::Unauthorized));

    let err = h.orders.accept_order(&h.buyer, order_id).await.unwrap_err();
    assert!(matches!(domain_err(err), DomainError::Unauthorized));
}
