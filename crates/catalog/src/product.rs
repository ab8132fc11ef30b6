//! Product record + stock movement rules.

use serde::{Deserialize, Serialize};

use tradegate_core::{AuditStamp, DomainError, DomainResult, Entity, ProductId, UserId};

/// A sellable product, owned by exactly one seller.
///
/// The order engine treats this as a narrow collaborator contract: resolve by
/// id, read price/stock/owner, move stock. Nothing else is touched here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub seller_id: UserId,
    pub name: String,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
    pub stock: i64,
    pub active: bool,
    pub audit: AuditStamp,
}

impl Product {
    /// Take `quantity` units out of stock for an order line.
    ///
    /// Fails without mutating when the quantity is non-positive or exceeds the
    /// available stock.
    pub fn reserve(&mut self, quantity: i64) -> DomainResult<()> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if quantity > self.stock {
            return Err(DomainError::InsufficientStock {
                product: self.name.clone(),
                requested: quantity,
                available: self.stock,
            });
        }
        self.stock -= quantity;
        Ok(())
    }

    /// Return `quantity` units to stock (order cancellation).
    pub fn restock(&mut self, quantity: i64) -> DomainResult<()> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        self.stock += quantity;
        Ok(())
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
