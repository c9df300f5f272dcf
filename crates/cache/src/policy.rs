//! Per-tier eviction strategies.

use crate::error::{ErrorKind, Result};
use crate::key::Tier;
use std::time::Duration;

/// Default lifetime of a temporary record.
pub const TEMP_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Largest object accepted by the temporary tier.
pub const TEMP_MAX_OBJECT_BYTES: u64 = 25 * 1024 * 1024;
/// Total bytes the temporary tier may hold before evicting.
pub const TEMP_BUDGET_BYTES: u64 = 256 * 1024 * 1024;
/// Maximum number of thumbnails kept.
pub const THUMBNAIL_LIMIT: u64 = 1000;

/// How a tier bounds what it stores.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Policy {
    /// Never evicted; records live until overwritten or cleared.
    Retain,
    /// Records expire `ttl` after being written and are deleted when read
    /// after that. Values above `max_object_bytes` are refused, and the oldest
    /// records are evicted whenever the tier holds more than `budget_bytes`.
    Expiring { ttl: Duration, max_object_bytes: u64, budget_bytes: u64 },
    /// Records are only returned when they match the live shape of the
    /// object; mismatches are discarded on read.
    ShapeValidated,
    /// At most `limit` records, evicting the least recently accessed.
    LeastRecentlyUsed { limit: u64 },
}
impl Policy {
    /// Refuse values this policy will never store.
    pub(crate) fn admit(&self, size: u64) -> Result<()> {
        match self {
            Self::Expiring { max_object_bytes, .. } if size > *max_object_bytes => {
                exn::bail!(ErrorKind::TooLarge { size, limit: *max_object_bytes })
            },
            _ => Ok(()),
        }
    }

    /// Absolute expiry (unix milliseconds) of a record written at `now`.
    pub(crate) fn expires_at(&self, now: i64) -> Option<i64> {
        match self {
            Self::Expiring { ttl, .. } => {
                Some(now.saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)))
            },
            _ => None,
        }
    }

    /// Reads bump the record's recency.
    pub(crate) fn tracks_access(&self) -> bool {
        matches!(self, Self::LeastRecentlyUsed { .. })
    }
}

/// The policy of each tier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Policies {
    pub permanent: Policy,
    pub temporary: Policy,
    pub preview: Policy,
    pub thumbnail: Policy,
}
impl Default for Policies {
    fn default() -> Self {
        Self::new(TEMP_TTL, TEMP_MAX_OBJECT_BYTES, TEMP_BUDGET_BYTES, THUMBNAIL_LIMIT)
    }
}
impl Policies {
    pub fn new(temp_ttl: Duration, temp_max_object_bytes: u64, temp_budget_bytes: u64, thumbnail_limit: u64) -> Self {
        Self {
            permanent: Policy::Retain,
            temporary: Policy::Expiring {
                ttl: temp_ttl,
                max_object_bytes: temp_max_object_bytes,
                budget_bytes: temp_budget_bytes,
            },
            preview: Policy::ShapeValidated,
            thumbnail: Policy::LeastRecentlyUsed { limit: thumbnail_limit },
        }
    }

    #[must_use]
    pub fn for_tier(&self, tier: Tier) -> &Policy {
        match tier {
            Tier::Permanent => &self.permanent,
            Tier::Temporary => &self.temporary,
            Tier::Preview => &self.preview,
            Tier::Thumbnail => &self.thumbnail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiring_policy_refuses_oversized_values() {
        let policy = Policies::default().temporary;
        assert!(policy.admit(TEMP_MAX_OBJECT_BYTES).is_ok());
        let err = policy.admit(TEMP_MAX_OBJECT_BYTES + 1).unwrap_err();
        assert!(matches!(&*err, ErrorKind::TooLarge { .. }));
        assert!(Policy::Retain.admit(u64::MAX).is_ok());
    }

    #[test]
    fn only_expiring_policy_sets_expiry() {
        let policies = Policies::default();
        assert_eq!(policies.temporary.expires_at(1_000), Some(1_000 + 86_400_000));
        assert_eq!(policies.permanent.expires_at(1_000), None);
        assert_eq!(policies.thumbnail.expires_at(1_000), None);
    }

    #[test]
    fn tier_lookup() {
        let policies = Policies::default();
        assert_eq!(policies.for_tier(Tier::Preview), &Policy::ShapeValidated);
        assert_eq!(policies.for_tier(Tier::Thumbnail), &Policy::LeastRecentlyUsed { limit: THUMBNAIL_LIMIT });
    }
}
