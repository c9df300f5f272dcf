use std::fmt::{Display, Formatter, Result as FmtResult};

/// The four independent key spaces of the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Full content, kept until overwritten or cleared.
    Permanent,
    /// Full content of large media, expiring and byte-budgeted.
    Temporary,
    /// A chunk-aligned prefix of an object, used to resume streaming.
    Preview,
    /// Small derived images, pruned least-recently-used first.
    Thumbnail,
}
impl Tier {
    pub const ALL: [Tier; 4] = [Self::Permanent, Self::Temporary, Self::Preview, Self::Thumbnail];

    /// Prefix of every key stored in this tier.
    #[must_use]
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Permanent => "inscription-data",
            Self::Temporary => "inscription-temp",
            Self::Preview => "inscription-preview",
            Self::Thumbnail => "inscription-thumb",
        }
    }

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Permanent => "permanent",
            Self::Temporary => "temporary",
            Self::Preview => "preview",
            Self::Thumbnail => "thumbnail",
        }
    }
}
impl Display for Tier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Identity of a cached object: the collection (contract) it belongs to and
/// its id within that collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub collection: String,
    pub object: u64,
}
impl CacheKey {
    pub fn new(collection: impl Into<String>, object: u64) -> Self {
        Self { collection: collection.into(), object }
    }

    /// Storage key of this object within `tier`.
    #[must_use]
    pub fn render(&self, tier: Tier) -> String {
        format!("{}:{}:{}", tier.prefix(), self.collection, self.object)
    }
}
impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}", self.collection, self.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Tier::Permanent, "inscription-data:SP123.fake-contract:42")]
    #[case(Tier::Temporary, "inscription-temp:SP123.fake-contract:42")]
    #[case(Tier::Preview, "inscription-preview:SP123.fake-contract:42")]
    #[case(Tier::Thumbnail, "inscription-thumb:SP123.fake-contract:42")]
    fn test_render(#[case] tier: Tier, #[case] expected: &str) {
        assert_eq!(CacheKey::new("SP123.fake-contract", 42).render(tier), expected);
    }

    #[test]
    fn keys_differ_by_object_and_collection() {
        let first = CacheKey::new("SP123.fake-contract", 1).render(Tier::Permanent);
        let second = CacheKey::new("SP123.fake-contract", 2).render(Tier::Permanent);
        let third = CacheKey::new("SP456.other-contract", 1).render(Tier::Permanent);
        assert_ne!(first, second);
        assert_ne!(first, third);
    }
}
