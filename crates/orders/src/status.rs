//! Order status lifecycle.

use serde::{Deserialize, Serialize};

use tradegate_core::DomainError;

/// Order lifecycle status.
///
/// ```text
/// CREATED ──► CONFIRMED ──► ACCEPTED ──► SHIPPED ──► DELIVERED
///    │            │    └──► REJECTED
///    └────────────┴──► CANCELLED (also from ACCEPTED)
/// ```
///
/// `REJECTED`, `DELIVERED` and `CANCELLED` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    Confirmed,
    Accepted,
    Rejected,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Legal direct successors of a status.
    pub fn valid_next(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Created => &[Confirmed, Cancelled],
            Confirmed => &[Accepted, Rejected, Cancelled],
            Accepted => &[Shipped, Cancelled],
            Shipped => &[Delivered],
            Rejected | Delivered | Cancelled => &[],
        }
    }

    pub fn can_transition(self, to: OrderStatus) -> bool {
        self.valid_next().contains(&to)
    }

    pub fn is_terminal(self) -> bool {
        self.valid_next().is_empty()
    }

    /// May a seller set this status through the generic update endpoint?
    ///
    /// `CONFIRMED` is reachable only through payment verification and
    /// `CANCELLED` only through the cancel operation.
    pub fn seller_settable(self) -> bool {
        use OrderStatus::*;
        matches!(self, Accepted | Rejected | Shipped | Delivered)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Accepted => "ACCEPTED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(OrderStatus::Created),
            "CONFIRMED" => Ok(OrderStatus::Confirmed),
            "ACCEPTED" => Ok(OrderStatus::Accepted),
            "REJECTED" => Ok(OrderStatus::Rejected),
            "SHIPPED" => Ok(OrderStatus::Shipped),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::validation(format!("unknown order status: {other}"))),
        }
    }
}

pub const ALL_STATUSES: [OrderStatus; 7] = [
    OrderStatus::Created,
    OrderStatus::Confirmed,
    OrderStatus::Accepted,
    OrderStatus::Rejected,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
];
