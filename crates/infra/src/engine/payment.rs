//! Payment engine: two-phase hosted-checkout flow.
//!
//! Phase 1 creates a gateway-side order and the local `INITIATED` payment
//! row; phase 2 verifies the checkout signature and is the only code path
//! that can mark a payment `SUCCESS`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tradegate_auth::Actor;
use tradegate_core::{DomainError, OrderId, UserId};
use tradegate_invoicing::Invoice;
use tradegate_orders::{Order, OrderEvent, OrderEventType, OrderStatus};
use tradegate_payments::{Payment, PaymentGatewayClient, PaymentStatus};

use crate::engine::{EngineError, EngineResult};
use crate::store::{MarketStore, MarketTx, StoreError, UniqueConstraint};

/// Currency and receipt settings for gateway orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOptions {
    pub currency: String,
    pub receipt_prefix: String,
}

impl Default for PaymentOptions {
    fn default() -> Self {
        Self {
            currency: "INR".to_string(),
            receipt_prefix: "rcpt".to_string(),
        }
    }
}

/// Phase-1 result handed back to the checkout frontend.
///
/// `gateway_order_id` is `None` only on the idempotent replay of an already
/// successful payment, where no new gateway order must be created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrderOutcome {
    pub order_id: OrderId,
    pub gateway_order_id: Option<String>,
    pub amount: u64,
    pub currency: String,
}

/// Phase-2 input: what the gateway handed to the buyer's client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
    pub order_id: OrderId,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

#[derive(Clone)]
pub struct PaymentEngine {
    store: Arc<dyn MarketStore>,
    gateway: Arc<dyn PaymentGatewayClient>,
    options: PaymentOptions,
}

impl PaymentEngine {
    pub fn new(
        store: Arc<dyn MarketStore>,
        gateway: Arc<dyn PaymentGatewayClient>,
        options: PaymentOptions,
    ) -> Self {
        Self {
            store,
            gateway,
            options,
        }
    }

    /// Phase 1: create the gateway order and the local payment row.
    ///
    /// Idempotent: an existing payment with a gateway order id is returned
    /// unchanged; an already successful payment re-runs the confirm/invoice
    /// invariants and returns without touching the gateway. If two concurrent
    /// calls race on the first insert, the loser catches the uniqueness
    /// violation and reads the winner's row instead of failing.
    #[instrument(skip(self), fields(order_id = %order_id, buyer = %actor.user_id))]
    pub async fn create_gateway_order(
        &self,
        actor: &Actor,
        order_id: OrderId,
    ) -> EngineResult<GatewayOrderOutcome> {
        if !actor.role.can_buy() {
            return Err(DomainError::Unauthorized.into());
        }

        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let mut order = self.buyer_order(tx.as_mut(), actor, order_id).await?;

        if let Some(existing) = tx.find_payment_by_order(order_id).await? {
            if existing.gateway_order_id.is_some() {
                return Ok(self.outcome_from(&existing));
            }
            if existing.status == PaymentStatus::Success {
                ensure_confirmed_and_invoiced(tx.as_mut(), &mut order, Some(actor.user_id), now).await?;
                tx.commit().await?;
                return Ok(GatewayOrderOutcome {
                    order_id,
                    gateway_order_id: None,
                    amount: existing.amount,
                    currency: self.options.currency.clone(),
                });
            }
        }

        // A brand new payment is only allowed against a payable order.
        if order.status != OrderStatus::Created {
            return Err(DomainError::InvalidOrderStatus {
                order: order_id,
                status: order.status.to_string(),
            }
            .into());
        }

        // Create the gateway order first so the id is persisted with the row.
        let receipt = format!("{}-order-{}", self.options.receipt_prefix, order_id);
        let gateway_order = self
            .gateway
            .create_order(order.total_amount, &self.options.currency, &receipt)
            .await?;

        let payment = Payment::initiated(
            order_id,
            actor.user_id,
            order.total_amount,
            self.gateway.name(),
            gateway_order.id,
            now,
        );

        match tx.insert_payment(&payment).await {
            Ok(()) => {}
            Err(StoreError::UniqueViolation(UniqueConstraint::PaymentPerOrder)) => {
                // Lost the race: another request created the payment first.
                let winner = tx.find_payment_by_order(order_id).await?.ok_or_else(|| {
                    StoreError::backend("payment row missing after unique violation")
                })?;
                return Ok(self.outcome_from(&winner));
            }
            Err(e) => return Err(e.into()),
        }

        tx.insert_order_event(&OrderEvent::new(
            order_id,
            OrderEventType::PaymentCreated,
            Some(order.status),
            Some(order.status),
            Some(actor.user_id),
            Some("Payment initiated (gateway order created)".to_string()),
            now,
        ))
        .await?;
        tx.commit().await?;

        Ok(self.outcome_from(&payment))
    }

    /// Phase 2: verify the checkout response. The only path to `SUCCESS`.
    #[instrument(skip(self, request), fields(order_id = %request.order_id, buyer = %actor.user_id))]
    pub async fn verify_payment(&self, actor: &Actor, request: VerifyPaymentRequest) -> EngineResult<()> {
        if !actor.role.can_buy() {
            return Err(DomainError::Unauthorized.into());
        }

        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let mut order = self.buyer_order(tx.as_mut(), actor, request.order_id).await?;

        let mut payment = tx
            .find_payment_by_order(request.order_id)
            .await?
            .ok_or(DomainError::not_found("Payment"))?;

        // Idempotent: an already verified payment only re-checks invariants.
        if payment.status == PaymentStatus::Success {
            ensure_confirmed_and_invoiced(tx.as_mut(), &mut order, Some(actor.user_id), now).await?;
            tx.commit().await?;
            return Ok(());
        }

        if payment.gateway_order_id.as_deref() != Some(request.gateway_order_id.as_str()) {
            return Err(DomainError::InvalidSignature.into());
        }

        let valid = self.gateway.verify_signature(
            &request.gateway_order_id,
            &request.gateway_payment_id,
            &request.signature,
        );
        if !valid {
            if payment.status != PaymentStatus::Failed {
                payment.mark_failed()?;
                tx.update_payment(&payment).await?;
                tx.commit().await?;
            }
            return Err(DomainError::InvalidSignature.into());
        }

        payment.mark_success(request.gateway_payment_id)?;
        tx.update_payment(&payment).await?;

        ensure_confirmed_and_invoiced(tx.as_mut(), &mut order, Some(actor.user_id), now).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Read the payment for an order; caller must be a participant.
    pub async fn get_payment(&self, actor: &Actor, order_id: OrderId) -> EngineResult<Payment> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .find_order(order_id)
            .await?
            .ok_or(DomainError::not_found("Order"))?;
        if !order.is_participant(actor.user_id) {
            return Err(DomainError::Unauthorized.into());
        }
        tx.find_payment_by_order(order_id)
            .await?
            .ok_or(DomainError::not_found("Payment").into())
    }

    /// Read the invoice for an order; caller must be a participant.
    pub async fn get_invoice(&self, actor: &Actor, order_id: OrderId) -> EngineResult<Invoice> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .find_order(order_id)
            .await?
            .ok_or(DomainError::not_found("Order"))?;
        if !order.is_participant(actor.user_id) {
            return Err(DomainError::Unauthorized.into());
        }
        tx.find_invoice_by_order(order_id)
            .await?
            .ok_or(DomainError::not_found("Invoice").into())
    }

    fn outcome_from(&self, payment: &Payment) -> GatewayOrderOutcome {
        GatewayOrderOutcome {
            order_id: payment.order_id,
            gateway_order_id: payment.gateway_order_id.clone(),
            amount: payment.amount,
            currency: self.options.currency.clone(),
        }
    }

    /// Resolve an order owned by the acting buyer.
    async fn buyer_order(
        &self,
        tx: &mut dyn MarketTx,
        actor: &Actor,
        order_id: OrderId,
    ) -> Result<Order, EngineError> {
        let order = tx
            .find_order(order_id)
            .await?
            .ok_or(DomainError::not_found("Order"))?;
        if order.buyer_id != actor.user_id {
            return Err(DomainError::Unauthorized.into());
        }
        Ok(order)
    }
}

/// Once a payment is successful the order must be confirmed and invoiced.
///
/// Both steps are idempotent against concurrent retries: the confirm step is
/// skipped unless the order is still `CREATED`, and a lost race on the
/// invoice insert is treated as success.
pub(crate) async fn ensure_confirmed_and_invoiced(
    tx: &mut dyn MarketTx,
    order: &mut Order,
    actor: Option<UserId>,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    if order.status == OrderStatus::Created {
        let from = order.transition(OrderStatus::Confirmed, actor, now)?;
        tx.update_order(order).await?;
        tx.insert_order_event(&OrderEvent::status_changed(
            order.id,
            from,
            OrderStatus::Confirmed,
            actor,
            Some("Order confirmed by payment".to_string()),
            now,
        ))
        .await?;
    }

    if tx.find_invoice_by_order(order.id).await?.is_none() {
        let invoice = Invoice::issue(order.id, order.buyer_id, order.total_amount, now);
        match tx.insert_invoice(&invoice).await {
            Ok(()) => {
                tx.insert_order_event(&OrderEvent::new(
                    order.id,
                    OrderEventType::InvoiceGenerated,
                    Some(order.status),
                    Some(order.status),
                    actor,
                    Some(format!("Invoice generated ({})", invoice.invoice_number)),
                    now,
                ))
                .await?;
            }
            // Another writer created the invoice between our read and insert.
            Err(StoreError::UniqueViolation(UniqueConstraint::InvoicePerOrder)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
