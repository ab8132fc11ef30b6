//! The acting user of an operation.

use serde::{Deserialize, Serialize};

use tradegate_core::UserId;

use crate::roles::Role;

/// Authenticated identity + role, passed explicitly into every core
/// operation. There is no ambient/global "current user".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn retailer(user_id: UserId) -> Self {
        Self::new(user_id, Role::Retailer)
    }

    pub fn manufacturer(user_id: UserId) -> Self {
        Self::new(user_id, Role::Manufacturer)
    }
}
