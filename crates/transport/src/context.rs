use inscribe_cache::{Cache, CacheKey};
use inscribe_chunk::mime::is_streamable;
use inscribe_config::CacheConfig;
use inscribe_store::ObjectId;

/// A cache together with the collection its object ids belong to.
#[derive(Clone, Debug)]
pub struct CacheContext {
    pub cache: Cache,
    /// Contract (collection) identifier; object ids are only unique within it.
    pub collection: String,
    pub settings: CacheConfig,
}
impl CacheContext {
    pub fn new(cache: Cache, collection: impl Into<String>, settings: CacheConfig) -> Self {
        Self { cache, collection: collection.into(), settings }
    }

    pub fn key(&self, object: ObjectId) -> CacheKey {
        CacheKey::new(self.collection.clone(), object.0)
    }

    /// Whether a fully read object belongs in the temporary tier rather than
    /// the permanent one: media too large to keep forever, but small enough
    /// to be worth keeping for a while.
    pub fn prefers_temporary(&self, total_size: u64, mime_type: Option<&str>) -> bool {
        is_streamable(mime_type)
            && total_size > self.settings.auto_preview_max_bytes
            && total_size <= self.settings.temp_max_object_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inscribe_cache::Database;
    use rstest::rstest;

    const MIB: u64 = 1024 * 1024;

    #[rstest]
    #[case(Some("audio/mpeg"), 4 * MIB, true)]
    #[case(Some("video/webm"), 25 * MIB, true)]
    // Small media is kept permanently.
    #[case(Some("audio/mpeg"), 200 * 1024, false)]
    // Too large for the temporary tier.
    #[case(Some("video/mp4"), 25 * MIB + 1, false)]
    #[case(Some("image/png"), 4 * MIB, false)]
    #[case(None, 4 * MIB, false)]
    #[tokio::test]
    async fn test_prefers_temporary(#[case] mime_type: Option<&str>, #[case] size: u64, #[case] expected: bool) {
        let db = Database::connect_in_memory().await.unwrap();
        let context = CacheContext::new(Cache::from(&db), "SP123.collection", CacheConfig::default());
        assert_eq!(context.prefers_temporary(size, mime_type), expected);
        assert_eq!(context.key(ObjectId(7)).to_string(), "SP123.collection:7");
    }
}
