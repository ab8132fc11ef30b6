//! Refund entity.
//!
//! Two entry paths: a buyer-initiated request that waits for seller approval,
//! and a system-initiated refund that starts directly in `PROCESSING` (seller
//! rejected or cancelled a paid order). At most one refund exists per order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tradegate_core::{AuditStamp, DomainError, DomainResult, Entity, OrderId, PaymentId, RefundId, UserId};

/// Refund lifecycle.
///
/// ```text
/// PENDING_APPROVAL ──► APPROVED ──► PROCESSING ──► PROCESSED
///        └──► REJECTED                  ▲
///             (system path starts here ─┘)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    PendingApproval,
    Approved,
    Processing,
    Processed,
    Rejected,
}

impl RefundStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RefundStatus::Processed | RefundStatus::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::PendingApproval => "PENDING_APPROVAL",
            RefundStatus::Approved => "APPROVED",
            RefundStatus::Processing => "PROCESSING",
            RefundStatus::Processed => "PROCESSED",
            RefundStatus::Rejected => "REJECTED",
        }
    }
}

impl core::fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for RefundStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_APPROVAL" => Ok(RefundStatus::PendingApproval),
            "APPROVED" => Ok(RefundStatus::Approved),
            "PROCESSING" => Ok(RefundStatus::Processing),
            "PROCESSED" => Ok(RefundStatus::Processed),
            "REJECTED" => Ok(RefundStatus::Rejected),
            other => Err(DomainError::validation(format!("unknown refund status: {other}"))),
        }
    }
}

/// Who started the refund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundInitiatedBy {
    /// Seller rejected/cancelled a paid order; no approval needed.
    System,
    /// Buyer cancelled a paid order; seller must approve.
    Retailer,
}

impl RefundInitiatedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundInitiatedBy::System => "SYSTEM",
            RefundInitiatedBy::Retailer => "RETAILER",
        }
    }
}

impl core::str::FromStr for RefundInitiatedBy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SYSTEM" => Ok(RefundInitiatedBy::System),
            "RETAILER" => Ok(RefundInitiatedBy::Retailer),
            other => Err(DomainError::validation(format!("unknown refund initiator: {other}"))),
        }
    }
}

/// One refund per order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub id: RefundId,
    pub order_id: OrderId,
    pub payment_id: PaymentId,
    pub gateway: String,
    pub initiated_by: RefundInitiatedBy,
    pub status: RefundStatus,
    pub reason: Option<String>,
    pub seller_note: Option<String>,
    pub requested_at: DateTime<Utc>,
    /// Decision timestamp. For anything in `PROCESSING` this doubles as the
    /// processing-start clock the settlement sweep measures against.
    pub approved_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub refund_reference: Option<String>,
    pub audit: AuditStamp,
}

impl Refund {
    /// System-initiated refund: enters `PROCESSING` immediately.
    pub fn auto_processing(
        order_id: OrderId,
        payment_id: PaymentId,
        gateway: impl Into<String>,
        reason: Option<String>,
        actor: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RefundId::new(),
            order_id,
            payment_id,
            gateway: gateway.into(),
            initiated_by: RefundInitiatedBy::System,
            status: RefundStatus::Processing,
            reason,
            seller_note: None,
            requested_at: now,
            approved_at: Some(now),
            processed_at: None,
            refund_reference: None,
            audit: AuditStamp::on_create(actor, now),
        }
    }

    /// Buyer-initiated refund request awaiting seller approval.
    pub fn requested(
        order_id: OrderId,
        payment_id: PaymentId,
        gateway: impl Into<String>,
        reason: Option<String>,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RefundId::new(),
            order_id,
            payment_id,
            gateway: gateway.into(),
            initiated_by: RefundInitiatedBy::Retailer,
            status: RefundStatus::PendingApproval,
            reason,
            seller_note: None,
            requested_at: now,
            approved_at: None,
            processed_at: None,
            refund_reference: None,
            audit: AuditStamp::on_create(Some(actor), now),
        }
    }

    fn require(&self, expected: RefundStatus) -> DomainResult<()> {
        if self.status != expected {
            return Err(DomainError::invalid_transition(format!(
                "refund is {} (expected {expected})",
                self.status
            )));
        }
        Ok(())
    }

    /// Seller approves a pending request.
    pub fn approve(&mut self, note: Option<String>, actor: UserId, now: DateTime<Utc>) -> DomainResult<()> {
        self.require(RefundStatus::PendingApproval)?;
        self.status = RefundStatus::Approved;
        self.approved_at = Some(now);
        self.seller_note = note.map(|n| n.trim().to_string());
        self.audit.touch(Some(actor), now);
        Ok(())
    }

    /// Move an approved refund into `PROCESSING`. `approved_at` stays as the
    /// processing-start clock.
    pub fn begin_processing(&mut self, actor: Option<UserId>, now: DateTime<Utc>) -> DomainResult<()> {
        self.require(RefundStatus::Approved)?;
        self.status = RefundStatus::Processing;
        self.audit.touch(actor, now);
        Ok(())
    }

    /// Seller rejects a pending request. The buyer keeps the charge.
    pub fn reject(&mut self, note: Option<String>, actor: UserId, now: DateTime<Utc>) -> DomainResult<()> {
        self.require(RefundStatus::PendingApproval)?;
        self.status = RefundStatus::Rejected;
        self.approved_at = Some(now);
        self.seller_note = note.map(|n| n.trim().to_string());
        self.audit.touch(Some(actor), now);
        Ok(())
    }

    /// Terminal settlement by the sweep; assigns a reference if absent.
    pub fn finalize(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.require(RefundStatus::Processing)?;
        self.status = RefundStatus::Processed;
        self.processed_at = Some(now);
        if self.refund_reference.is_none() {
            self.refund_reference = Some(format!("RF-{}", Uuid::now_v7()));
        }
        self.audit.touch(None, now);
        Ok(())
    }
}

impl Entity for Refund {
    type Id = RefundId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
