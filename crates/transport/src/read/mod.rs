//! Whole-object reads from the remote store.
//!
//! The store only records an object's total byte size, so a [`Reader`]
//! fetches chunk 0 on its own to learn the chunk size, derives the expected
//! chunk count from it, and then fetches the rest with
//! [`Reader::fetch_range`]: batched where the store allows it, shrinking the
//! batches when the store reports them as too expensive, and falling back to
//! a bounded pool of individual reads otherwise.
//!
//! With a [`CacheContext`] attached, [`Reader::read_object`] is served from
//! the permanent or temporary cache tier when possible, and writes the bytes
//! back after a successful network read.

pub mod error;
mod fetch;

use crate::context::CacheContext;
use crate::read::error::{ErrorKind, Result};
use exn::ResultExt;
use inscribe_chunk::expected_chunk_count;
use inscribe_chunk::mime::resolve_mime;
use inscribe_config::ReaderConfig;
use inscribe_store::{ObjectId, StoreHandle};
use tracing::instrument;

/// Reads objects from a [store](inscribe_store::ChunkStore), optionally
/// through a cache.
#[derive(Clone)]
pub struct Reader {
    store: StoreHandle,
    config: ReaderConfig,
    cache: Option<CacheContext>,
}
impl Reader {
    pub fn new(store: StoreHandle, config: ReaderConfig) -> Self {
        Self { store, config, cache: None }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: CacheContext) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Read the complete content of `object`.
    ///
    /// Returns exactly `total_size` bytes: padding the store adds to the final
    /// chunk is cut off. An object of zero bytes is returned without touching
    /// the store or the cache.
    ///
    /// # Errors
    /// - [`MissingChunk`](ErrorKind::MissingChunk) if any chunk exhausts its
    ///   retries.
    /// - [`Truncated`](ErrorKind::Truncated) if the chunks add up to less than
    ///   `total_size`.
    /// - [`TooLarge`](ErrorKind::TooLarge) if `total_size` does not fit in
    ///   memory on this platform.
    ///
    /// Cache failures are logged and otherwise ignored.
    #[instrument(skip(self), fields(store = self.store.name()))]
    pub async fn read_object(&self, object: ObjectId, total_size: u64, mime_type: Option<&str>) -> Result<Vec<u8>> {
        if total_size == 0 {
            return Ok(Vec::new());
        }
        let expected = usize::try_from(total_size).or_raise(|| ErrorKind::TooLarge(total_size))?;
        if let Some(data) = self.cached(object, expected).await {
            return Ok(data);
        }

        let first = self.fetch_chunk(object, 0).await?;
        let chunk_count = expected_chunk_count(total_size, first.len());
        tracing::info!(
            chunk_size = first.len(),
            chunk_count,
            batched = self.store.supports_chunk_batch_read(),
            "Reading object from store",
        );
        let rest = self.fetch_range(object, 1..chunk_count).await?;

        let mut data = Vec::with_capacity(expected);
        data.extend_from_slice(&first);
        for chunk in &rest {
            data.extend_from_slice(chunk);
        }
        if data.len() < expected {
            exn::bail!(ErrorKind::Truncated { expected: total_size, actual: data.len() as u64 });
        }
        data.truncate(expected);
        self.write_back(object, &data, mime_type).await;
        Ok(data)
    }

    /// Full content from the cache, if a record at least `expected` bytes long
    /// exists.
    async fn cached(&self, object: ObjectId, expected: usize) -> Option<Vec<u8>> {
        let context = self.cache.as_ref()?;
        let key = context.key(object);
        let mut value = match context.cache.load(&key).await {
            Ok(value) => value?,
            Err(e) => {
                tracing::warn!(%key, error = %e, "Cache read failed");
                return None;
            },
        };
        if value.data.len() < expected {
            tracing::warn!(%key, cached = value.data.len(), expected, "Ignoring truncated cache record");
            return None;
        }
        value.data.truncate(expected);
        Some(value.data)
    }

    async fn write_back(&self, object: ObjectId, data: &[u8], mime_type: Option<&str>) {
        let Some(context) = &self.cache else {
            return;
        };
        let key = context.key(object);
        // Mislabelled media is classified by its magic bytes.
        let resolved = resolve_mime(mime_type, data);
        let mime_type = resolved.as_deref();
        let result = if context.prefers_temporary(data.len() as u64, mime_type) {
            context.cache.put_temporary(&key, data, mime_type).await
        } else {
            context.cache.put_permanent(&key, data, mime_type).await
        };
        if let Err(e) = result {
            tracing::warn!(%key, error = %e, "Could not cache object");
        }
    }
}
