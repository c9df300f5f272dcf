//! Tiered access to the cache database.
//!
//! Every tier lives in the same table, keyed by `(tier, key)`. What differs
//! between tiers is the [`Policy`] applied around each read and write, and
//! the metadata decoded from the record.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::key::{CacheKey, Tier};
use crate::models::{CachedValue, Preview, PreviewMeta, PreviewShape, RecordRow, Thumbnail, ThumbnailMeta, TierUsage, UsageRow};
use crate::policy::{Policies, Policy};
use exn::ResultExt;
use sqlx::{Sqlite, SqlitePool, Transaction};
use time::UtcDateTime;

fn now_millis() -> i64 {
    (UtcDateTime::now().unix_timestamp_nanos() / 1_000_000) as i64
}

fn size_of(data: &[u8]) -> Result<i64> {
    i64::try_from(data.len()).or_raise(|| ErrorKind::InvalidData("value size"))
}

/// The cache: four key spaces over one SQLite table, each bounded by its own
/// [`Policy`].
///
/// Reads check permanent before temporary for full content
/// ([`load()`](Self::load)); previews are validated against the live object
/// shape before they are returned; thumbnails are bumped on every read and
/// pruned least-recently-used first.
#[derive(Debug, Clone)]
pub struct Cache {
    pool: SqlitePool,
    policies: Policies,
}
impl From<&Database> for Cache {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone(), policies: Policies::default() }
    }
}
impl Cache {
    pub fn new(pool: SqlitePool, policies: Policies) -> Self {
        Self { pool, policies }
    }

    #[must_use]
    pub fn with_policies(mut self, policies: Policies) -> Self {
        self.policies = policies;
        self
    }

    pub fn policies(&self) -> &Policies {
        &self.policies
    }

    // =========================================================================
    // Tier primitives
    // =========================================================================

    async fn fetch(&self, tier: Tier, key: &str) -> Result<Option<RecordRow>> {
        let row: Option<RecordRow> = sqlx::query_as(include_str!("../queries/get_record.sql"))
            .bind(tier.as_str())
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let Some(row) = row else {
            return Ok(None);
        };
        if row.is_expired(now_millis()) {
            tracing::debug!(%tier, key, "Cache record expired");
            self.remove(tier, key).await?;
            return Ok(None);
        }
        if self.policies.for_tier(tier).tracks_access() {
            sqlx::query(include_str!("../queries/touch_record.sql"))
                .bind(tier.as_str())
                .bind(key)
                .execute(&self.pool)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        Ok(Some(row))
    }

    async fn store(
        &self,
        tier: Tier,
        key: &str,
        data: &[u8],
        mime_type: Option<&str>,
        meta: Option<String>,
    ) -> Result<()> {
        let policy = self.policies.for_tier(tier);
        let size = size_of(data)?;
        policy.admit(size as u64)?;
        let now = now_millis();
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        sqlx::query(include_str!("../queries/upsert_record.sql"))
            .bind(tier.as_str())
            .bind(key)
            .bind(data)
            .bind(size)
            .bind(mime_type)
            .bind(meta)
            .bind(now)
            .bind(policy.expires_at(now))
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let evicted = Self::enforce(&mut tx, tier, policy).await?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        if evicted > 0 {
            tracing::info!(%tier, evicted, "Pruned cache tier");
        }
        tracing::debug!(%tier, key, bytes = data.len(), "Cached value");
        Ok(())
    }

    /// Apply the tier's bound after a write, returning the number of records
    /// evicted.
    async fn enforce(tx: &mut Transaction<'_, Sqlite>, tier: Tier, policy: &Policy) -> Result<u64> {
        let result = match policy {
            Policy::Retain | Policy::ShapeValidated => return Ok(0),
            Policy::Expiring { budget_bytes, .. } => {
                let budget = i64::try_from(*budget_bytes).unwrap_or(i64::MAX);
                sqlx::query(include_str!("../queries/prune_to_budget.sql"))
                    .bind(tier.as_str())
                    .bind(budget)
                    .execute(&mut **tx)
                    .await
            },
            Policy::LeastRecentlyUsed { limit } => {
                let limit = i64::try_from(*limit).unwrap_or(i64::MAX);
                sqlx::query(include_str!("../queries/prune_to_count.sql"))
                    .bind(tier.as_str())
                    .bind(limit)
                    .execute(&mut **tx)
                    .await
            },
        };
        Ok(result.or_raise(|| ErrorKind::Database)?.rows_affected())
    }

    async fn remove(&self, tier: Tier, key: &str) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/delete_record.sql"))
            .bind(tier.as_str())
            .bind(key)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Full content
    // =========================================================================

    /// Full content of an object: permanent tier first, temporary second.
    pub async fn load(&self, key: &CacheKey) -> Result<Option<CachedValue>> {
        if let Some(value) = self.get_permanent(key).await? {
            tracing::debug!(%key, "Cache hit");
            return Ok(Some(value));
        }
        let value = self.get_temporary(key).await?;
        match value {
            Some(_) => tracing::debug!(%key, "Temporary cache hit"),
            None => tracing::debug!(%key, "Cache miss"),
        }
        Ok(value)
    }

    pub async fn get_permanent(&self, key: &CacheKey) -> Result<Option<CachedValue>> {
        Ok(self.fetch(Tier::Permanent, &key.render(Tier::Permanent)).await?.map(CachedValue::from))
    }

    /// Store full content permanently, replacing any previous value.
    pub async fn put_permanent(&self, key: &CacheKey, data: &[u8], mime_type: Option<&str>) -> Result<()> {
        self.store(Tier::Permanent, &key.render(Tier::Permanent), data, mime_type, None).await
    }

    /// Temporary content that has not expired. Expired records are deleted.
    pub async fn get_temporary(&self, key: &CacheKey) -> Result<Option<CachedValue>> {
        Ok(self.fetch(Tier::Temporary, &key.render(Tier::Temporary)).await?.map(CachedValue::from))
    }

    /// Store full content until the temporary tier's TTL elapses.
    ///
    /// Returns [`TooLarge`](ErrorKind::TooLarge) for values above the tier's
    /// per-object ceiling. Older temporary records are evicted to keep the
    /// tier within its byte budget.
    pub async fn put_temporary(&self, key: &CacheKey, data: &[u8], mime_type: Option<&str>) -> Result<()> {
        self.store(Tier::Temporary, &key.render(Tier::Temporary), data, mime_type, None).await
    }

    // =========================================================================
    // Previews
    // =========================================================================

    /// The cached preview of an object, if it matches the object's live
    /// `shape`. Stale previews are deleted and reported as absent.
    pub async fn get_preview(&self, key: &CacheKey, shape: &PreviewShape) -> Result<Option<Preview>> {
        let rendered = key.render(Tier::Preview);
        let Some(row) = self.fetch(Tier::Preview, &rendered).await? else {
            return Ok(None);
        };
        let preview = match Preview::try_from(row) {
            Ok(preview) if preview.matches(shape) => preview,
            Ok(preview) => {
                tracing::warn!(
                    %key,
                    cached_chunks = preview.total_chunks,
                    live_chunks = shape.total_chunks,
                    cached_size = preview.total_size,
                    live_size = shape.total_size,
                    "Discarding stale preview",
                );
                self.remove(Tier::Preview, &rendered).await?;
                return Ok(None);
            },
            Err(err) => {
                tracing::warn!(%key, error = %err, "Discarding unreadable preview");
                self.remove(Tier::Preview, &rendered).await?;
                return Ok(None);
            },
        };
        Ok(Some(preview))
    }

    pub async fn put_preview(&self, key: &CacheKey, preview: &Preview) -> Result<()> {
        let meta = serde_json::to_string(&PreviewMeta::from(preview))
            .or_raise(|| ErrorKind::InvalidData("preview metadata"))?;
        self.store(Tier::Preview, &key.render(Tier::Preview), &preview.data, preview.mime_type.as_deref(), Some(meta))
            .await
    }

    // =========================================================================
    // Thumbnails
    // =========================================================================

    /// The cached thumbnail of an object. A hit marks it as recently used.
    pub async fn get_thumbnail(&self, key: &CacheKey) -> Result<Option<Thumbnail>> {
        self.fetch(Tier::Thumbnail, &key.render(Tier::Thumbnail)).await?.map(Thumbnail::try_from).transpose()
    }

    pub async fn put_thumbnail(&self, key: &CacheKey, thumbnail: &Thumbnail) -> Result<()> {
        let meta = serde_json::to_string(&ThumbnailMeta::from(thumbnail))
            .or_raise(|| ErrorKind::InvalidData("thumbnail metadata"))?;
        let rendered = key.render(Tier::Thumbnail);
        self.store(Tier::Thumbnail, &rendered, &thumbnail.data, thumbnail.mime_type.as_deref(), Some(meta)).await
    }

    /// Returns `true` if a thumbnail was deleted.
    pub async fn delete_thumbnail(&self, key: &CacheKey) -> Result<bool> {
        self.remove(Tier::Thumbnail, &key.render(Tier::Thumbnail)).await
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Empty every tier.
    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query(include_str!("../queries/clear.sql"))
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tracing::info!(removed = result.rows_affected(), "Cleared cache");
        Ok(result.rows_affected())
    }

    pub async fn usage(&self, tier: Tier) -> Result<TierUsage> {
        let row: UsageRow = sqlx::query_as(include_str!("../queries/tier_usage.sql"))
            .bind(tier.as_str())
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        TierUsage::try_from(row)
    }
}
