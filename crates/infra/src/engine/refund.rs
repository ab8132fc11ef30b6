//! Refund engine: request creation, seller decisions, invoice cancellation.
//!
//! The `*_in_tx` helpers run inside a caller-owned transaction so that order
//! rejection/cancellation and the refund bookkeeping they trigger commit
//! atomically.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use tradegate_auth::Actor;
use tradegate_core::{DomainError, OrderId, UserId};
use tradegate_orders::{Order, OrderEvent, OrderEventType};
use tradegate_payments::PaymentStatus;
use tradegate_refunds::{Refund, RefundStatus};

use crate::engine::{EngineError, EngineResult};
use crate::store::{MarketStore, MarketTx, StoreError, UniqueConstraint};

/// System-initiated refund: the seller rejected or cancelled a paid order.
///
/// No-op when a refund already exists or no successful payment is on record.
/// Moves the payment to `REFUND_PENDING`, creates the refund directly in
/// `PROCESSING` and cancels the invoice.
pub(crate) async fn auto_refund_in_tx(
    tx: &mut dyn MarketTx,
    order: &Order,
    actor: Option<UserId>,
    reason: Option<String>,
    note: &str,
    now: DateTime<Utc>,
) -> EngineResult<Option<Refund>> {
    if tx.find_refund_by_order(order.id).await?.is_some() {
        return Ok(None);
    }
    let Some(mut payment) = tx.find_payment_by_order(order.id).await? else {
        return Ok(None);
    };
    if payment.status != PaymentStatus::Success {
        return Ok(None);
    }

    payment.begin_refund()?;
    tx.update_payment(&payment).await?;

    let refund = Refund::auto_processing(order.id, payment.id, payment.gateway.clone(), reason, actor, now);
    match tx.insert_refund(&refund).await {
        Ok(()) => {}
        // A concurrent writer created the refund; that is success here.
        Err(StoreError::UniqueViolation(UniqueConstraint::RefundPerOrder)) => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    tx.insert_order_event(&OrderEvent::new(
        order.id,
        OrderEventType::RefundProcessing,
        Some(order.status),
        Some(order.status),
        actor,
        Some(note.to_string()),
        now,
    ))
    .await?;

    cancel_invoice_if_any(tx, order.id).await?;
    Ok(Some(refund))
}

/// Buyer-initiated refund request: the buyer cancelled a paid order.
///
/// Creates a `PENDING_APPROVAL` refund and leaves the payment untouched:
/// money stays captured until the seller decides.
pub(crate) async fn request_refund_in_tx(
    tx: &mut dyn MarketTx,
    order: &Order,
    buyer: UserId,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> EngineResult<Option<Refund>> {
    if tx.find_refund_by_order(order.id).await?.is_some() {
        return Ok(None);
    }
    let Some(payment) = tx.find_payment_by_order(order.id).await? else {
        return Ok(None);
    };
    if payment.status != PaymentStatus::Success {
        return Ok(None);
    }

    let refund = Refund::requested(order.id, payment.id, payment.gateway.clone(), reason, buyer, now);
    match tx.insert_refund(&refund).await {
        Ok(()) => {}
        Err(StoreError::UniqueViolation(UniqueConstraint::RefundPerOrder)) => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    tx.insert_order_event(&OrderEvent::new(
        order.id,
        OrderEventType::RefundRequested,
        Some(order.status),
        Some(order.status),
        Some(buyer),
        Some("Refund requested (buyer cancelled after payment)".to_string()),
        now,
    ))
    .await?;

    Ok(Some(refund))
}

/// Cancel the order's invoice if one exists. Idempotent; never deletes.
pub(crate) async fn cancel_invoice_if_any(tx: &mut dyn MarketTx, order_id: OrderId) -> EngineResult<()> {
    if let Some(mut invoice) = tx.find_invoice_by_order(order_id).await? {
        if invoice.status != tradegate_invoicing::InvoiceStatus::Cancelled {
            invoice.cancel();
            tx.update_invoice(&invoice).await?;
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct RefundEngine {
    store: Arc<dyn MarketStore>,
}

impl RefundEngine {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self { store }
    }

    /// Seller approves a pending refund request.
    ///
    /// Approval immediately pushes the refund into `PROCESSING` (re-using the
    /// approval time as the processing-start clock), marks the payment
    /// `REFUND_PENDING` and cancels the invoice.
    #[instrument(skip(self, note), fields(order_id = %order_id, seller = %actor.user_id))]
    pub async fn approve_refund(
        &self,
        actor: &Actor,
        order_id: OrderId,
        note: Option<String>,
    ) -> EngineResult<Refund> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let (order, mut refund) = self.seller_refund(tx.as_mut(), actor, order_id).await?;

        // Idempotent: already decided and moving through settlement.
        if matches!(refund.status, RefundStatus::Processing | RefundStatus::Processed) {
            return Ok(refund);
        }

        refund.approve(note, actor.user_id, now)?;
        tx.update_refund(&refund).await?;
        tx.insert_order_event(&OrderEvent::new(
            order_id,
            OrderEventType::RefundApproved,
            Some(order.status),
            Some(order.status),
            Some(actor.user_id),
            Some("Refund approved by seller".to_string()),
            now,
        ))
        .await?;

        if let Some(mut payment) = tx.find_payment_by_order(order_id).await? {
            if payment.status == PaymentStatus::Success {
                payment.begin_refund()?;
                tx.update_payment(&payment).await?;
            }
        }

        refund.begin_processing(Some(actor.user_id), now)?;
        tx.update_refund(&refund).await?;
        tx.insert_order_event(&OrderEvent::new(
            order_id,
            OrderEventType::RefundProcessing,
            Some(order.status),
            Some(order.status),
            Some(actor.user_id),
            Some("Refund processing started".to_string()),
            now,
        ))
        .await?;

        cancel_invoice_if_any(tx.as_mut(), order_id).await?;
        tx.commit().await?;
        Ok(refund)
    }

    /// Seller rejects a pending refund request. The buyer keeps the charge.
    #[instrument(skip(self, note), fields(order_id = %order_id, seller = %actor.user_id))]
    pub async fn reject_refund(
        &self,
        actor: &Actor,
        order_id: OrderId,
        note: Option<String>,
    ) -> EngineResult<Refund> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let (order, mut refund) = self.seller_refund(tx.as_mut(), actor, order_id).await?;

        if refund.status == RefundStatus::Rejected {
            return Ok(refund);
        }

        refund.reject(note, actor.user_id, now)?;
        tx.update_refund(&refund).await?;
        tx.insert_order_event(&OrderEvent::new(
            order_id,
            OrderEventType::RefundRejected,
            Some(order.status),
            Some(order.status),
            Some(actor.user_id),
            Some("Refund rejected by seller".to_string()),
            now,
        ))
        .await?;
        tx.commit().await?;
        Ok(refund)
    }

    /// Read the refund for an order; caller must be a participant.
    pub async fn get_refund(&self, actor: &Actor, order_id: OrderId) -> EngineResult<Refund> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .find_order(order_id)
            .await?
            .ok_or(DomainError::not_found("Order"))?;
        if !order.is_participant(actor.user_id) {
            return Err(DomainError::Unauthorized.into());
        }
        tx.find_refund_by_order(order_id)
            .await?
            .ok_or(DomainError::not_found("Refund").into())
    }

    /// Resolve the refund for an order the acting seller owns.
    async fn seller_refund(
        &self,
        tx: &mut dyn MarketTx,
        actor: &Actor,
        order_id: OrderId,
    ) -> Result<(Order, Refund), EngineError> {
        if !actor.role.can_fulfill() {
            return Err(DomainError::Unauthorized.into());
        }
        let refund = tx
            .find_refund_by_order(order_id)
            .await?
            .ok_or(DomainError::not_found("Refund"))?;
        let order = tx
            .find_order(order_id)
            .await?
            .ok_or(DomainError::not_found("Order"))?;
        if order.seller_id != actor.user_id {
            return Err(DomainError::Unauthorized.into());
        }
        Ok((order, refund))
    }
}
