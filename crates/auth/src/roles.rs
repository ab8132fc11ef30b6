//! Marketplace roles.
//!
//! The role set is deliberately a closed enum, not an open string: callers
//! authorize against explicit capability checks instead of runtime lookups.

use serde::{Deserialize, Serialize};

use tradegate_core::DomainError;

/// Role granted to an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Buyer side: places orders and pays for them.
    Retailer,
    /// Seller side: owns products and fulfills orders.
    Manufacturer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Retailer => "RETAILER",
            Role::Manufacturer => "MANUFACTURER",
        }
    }

    /// May this role place orders and drive the payment flow?
    pub fn can_buy(&self) -> bool {
        matches!(self, Role::Retailer)
    }

    /// May this role fulfill orders (accept/reject/ship/deliver) and decide refunds?
    pub fn can_fulfill(&self) -> bool {
        matches!(self, Role::Manufacturer)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RETAILER" => Ok(Role::Retailer),
            "MANUFACTURER" => Ok(Role::Manufacturer),
            other => Err(DomainError::validation(format!("unknown role: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_round_trip_through_strings() {
        for role in [Role::Retailer, Role::Manufacturer] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn capabilities_are_disjoint() {
        assert!(Role::Retailer.can_buy());
        assert!(!Role::Retailer.can_fulfill());
        assert!(Role::Manufacturer.can_fulfill());
        assert!(!Role::Manufacturer.can_buy());
    }
}
