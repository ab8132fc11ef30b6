//! Invoice entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tradegate_core::{DomainError, Entity, InvoiceId, OrderId, UserId};

/// Invoice status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Generated,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Generated => "GENERATED",
            InvoiceStatus::Cancelled => "CANCELLED",
        }
    }
}

impl core::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for InvoiceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GENERATED" => Ok(InvoiceStatus::Generated),
            "CANCELLED" => Ok(InvoiceStatus::Cancelled),
            other => Err(DomainError::validation(format!("unknown invoice status: {other}"))),
        }
    }
}

/// One invoice per order (uniqueness constraint on the order reference).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub order_id: OrderId,
    pub buyer_id: UserId,
    /// Amount in smallest currency unit; equals the order total.
    pub amount: u64,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// Issue an invoice for a paid order.
    pub fn issue(order_id: OrderId, buyer_id: UserId, amount: u64, now: DateTime<Utc>) -> Self {
        Self {
            id: InvoiceId::new(),
            invoice_number: format!("INV-{}", Uuid::now_v7()),
            order_id,
            buyer_id,
            amount,
            status: InvoiceStatus::Generated,
            created_at: now,
        }
    }

    /// Mark the invoice cancelled. Idempotent; invoices are never deleted.
    pub fn cancel(&mut self) {
        self.status = InvoiceStatus::Cancelled;
    }
}

impl Entity for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
