//! Payment entity and its status chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradegate_core::{DomainError, DomainResult, Entity, OrderId, PaymentId, UserId};

/// Payment lifecycle.
///
/// ```text
/// INITIATED ──► SUCCESS ──► REFUND_PENDING ──► REFUNDED
///      │           │              └──► REFUND_FAILED
///      └──► FAILED ┘ (failed verification may be retried)
/// ```
///
/// The settlement sweep may also move `SUCCESS` straight to `REFUNDED` when
/// no gateway refund call applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Initiated,
    Success,
    Failed,
    RefundPending,
    RefundFailed,
    Refunded,
}

impl PaymentStatus {
    pub fn can_transition(self, to: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, to),
            (Initiated, Success)
                | (Initiated, Failed)
                | (Failed, Success)
                | (Success, RefundPending)
                | (Success, Refunded)
                | (RefundPending, RefundFailed)
                | (RefundPending, Refunded)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Initiated => "INITIATED",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::RefundPending => "REFUND_PENDING",
            PaymentStatus::RefundFailed => "REFUND_FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }
}

impl core::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INITIATED" => Ok(PaymentStatus::Initiated),
            "SUCCESS" => Ok(PaymentStatus::Success),
            "FAILED" => Ok(PaymentStatus::Failed),
            "REFUND_PENDING" => Ok(PaymentStatus::RefundPending),
            "REFUND_FAILED" => Ok(PaymentStatus::RefundFailed),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            other => Err(DomainError::validation(format!("unknown payment status: {other}"))),
        }
    }
}

/// One payment attempt per order (enforced by a uniqueness constraint on the
/// order reference in storage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub buyer_id: UserId,
    /// Amount in smallest currency unit; equals the order total.
    pub amount: u64,
    pub status: PaymentStatus,
    /// Name of the configured gateway this payment went through.
    pub gateway: String,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// A freshly initiated payment holding the remote gateway order id.
    pub fn initiated(
        order_id: OrderId,
        buyer_id: UserId,
        amount: u64,
        gateway: impl Into<String>,
        gateway_order_id: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            order_id,
            buyer_id,
            amount,
            status: PaymentStatus::Initiated,
            gateway: gateway.into(),
            gateway_order_id: Some(gateway_order_id),
            gateway_payment_id: None,
            payment_reference: None,
            created_at: now,
        }
    }

    fn transition(&mut self, to: PaymentStatus) -> DomainResult<()> {
        if !self.status.can_transition(to) {
            return Err(DomainError::invalid_transition(format!(
                "cannot move payment from {} to {}",
                self.status, to
            )));
        }
        self.status = to;
        Ok(())
    }

    /// Record a verified checkout. The only path to `SUCCESS`.
    pub fn mark_success(&mut self, gateway_payment_id: String) -> DomainResult<()> {
        self.transition(PaymentStatus::Success)?;
        self.gateway_payment_id = Some(gateway_payment_id);
        Ok(())
    }

    /// Record a failed signature verification.
    pub fn mark_failed(&mut self) -> DomainResult<()> {
        self.transition(PaymentStatus::Failed)
    }

    /// Money is committed to come back: refund entered processing.
    pub fn begin_refund(&mut self) -> DomainResult<()> {
        self.transition(PaymentStatus::RefundPending)
    }

    /// The gateway rejected the refund call; a later sweep finalizes.
    pub fn mark_refund_failed(&mut self) -> DomainResult<()> {
        self.transition(PaymentStatus::RefundFailed)
    }

    /// Terminal refund settlement.
    pub fn mark_refunded(&mut self) -> DomainResult<()> {
        self.transition(PaymentStatus::Refunded)
    }
}

impl Entity for Payment {
    type Id = PaymentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment() -> Payment {
        Payment::initiated(
            OrderId::new(),
            UserId::new(),
            5_000,
            "RAZORPAY",
            "order_abc".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn verified_checkout_reaches_success_once() {
        let mut p = payment();
        p.mark_success("pay_123".to_string()).unwrap();
        assert_eq!(p.status, PaymentStatus::Success);
        assert_eq!(p.gateway_payment_id.as_deref(), Some("pay_123"));
        // Already SUCCESS: a second success is not a legal transition.
        assert!(p.mark_success("pay_456".to_string()).is_err());
    }

    #[test]
    fn failed_verification_can_be_retried() {
        let mut p = payment();
        p.mark_failed().unwrap();
        p.mark_success("pay_123".to_string()).unwrap();
        assert_eq!(p.status, PaymentStatus::Success);
    }

    #[test]
    fn refund_chain_is_ordered() {
        let mut p = payment();
        assert!(p.begin_refund().is_err());
        p.mark_success("pay_123".to_string()).unwrap();
        p.begin_refund().unwrap();
        p.mark_refund_failed().unwrap();
        assert_eq!(p.status, PaymentStatus::RefundFailed);
        assert!(p.mark_refunded().is_err());
    }

    #[test]
    fn sweep_may_settle_success_directly() {
        let mut p = payment();
        p.mark_success("pay_123".to_string()).unwrap();
        p.mark_refunded().unwrap();
        assert_eq!(p.status, PaymentStatus::Refunded);
    }
}
