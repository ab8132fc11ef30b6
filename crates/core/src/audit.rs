//! Audit metadata embedded in persisted entities.
//!
//! Every persisted entity that tracks "who touched this and when" embeds an
//! [`AuditStamp`] value instead of inheriting from a shared base record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// Created/updated timestamps plus the acting users that set them.
///
/// `created_by`/`updated_by` are `None` for system-initiated writes (e.g. the
/// settlement sweep acting without a request context).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStamp {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<UserId>,
    pub updated_by: Option<UserId>,
}

impl AuditStamp {
    /// Stamp for a freshly created entity.
    pub fn on_create(actor: Option<UserId>, now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            created_by: actor,
            updated_by: actor,
        }
    }

    /// Record a mutation by `actor` at `now`. Creation fields are untouched.
    pub fn touch(&mut self, actor: Option<UserId>, now: DateTime<Utc>) {
        self.updated_at = now;
        self.updated_by = actor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_preserves_creation_fields() {
        let creator = UserId::new();
        let editor = UserId::new();
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::seconds(5);

        let mut stamp = AuditStamp::on_create(Some(creator), t0);
        stamp.touch(Some(editor), t1);

        assert_eq!(stamp.created_at, t0);
        assert_eq!(stamp.created_by, Some(creator));
        assert_eq!(stamp.updated_at, t1);
        assert_eq!(stamp.updated_by, Some(editor));
    }
}
