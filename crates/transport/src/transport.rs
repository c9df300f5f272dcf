use crate::context::CacheContext;
use crate::error::{ErrorKind, Result};
use crate::read::Reader;
use crate::stream::{MediaSink, StreamEngine, StreamHandle, StreamRequest};
use crate::upload::{self, UploadEvent, UploadPhase, UploadPlan};
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use inscribe_cache::{Cache, Database, Policies};
use inscribe_chunk::{Digest, digest_bytes};
use inscribe_config::{CacheConfig, Config};
use inscribe_store::{Address, ObjectId, Receipt, SealMetadata, StoreHandle};

/// Reads, uploads and streams objects of one collection on a remote store.
///
/// Cloning is cheap; clones share the store and the cache.
#[derive(Clone)]
pub struct Transport {
    store: StoreHandle,
    config: Config,
    reader: Reader,
    streams: StreamEngine,
    cache: Option<CacheContext>,
}

fn policies(settings: &CacheConfig) -> Policies {
    Policies::new(
        settings.temp_ttl(),
        settings.temp_max_object_bytes,
        settings.temp_budget_bytes,
        settings.thumbnail_limit,
    )
}

impl Transport {
    /// A transport without a cache.
    pub fn new(store: StoreHandle, config: Config) -> Self {
        let reader = Reader::new(store.clone(), config.reader.clone());
        let streams = StreamEngine::new(reader.clone(), config.stream.clone());
        Self { store, config, reader, streams, cache: None }
    }

    /// Serve reads and streams for `collection` through `cache`, applying the
    /// configured eviction policies.
    #[must_use]
    pub fn with_cache(mut self, cache: Cache, collection: impl Into<String>) -> Self {
        let cache = cache.with_policies(policies(&self.config.cache));
        let context = CacheContext::new(cache, collection, self.config.cache.clone());
        self.reader = self.reader.with_cache(context.clone());
        self.streams = StreamEngine::new(self.reader.clone(), self.config.stream.clone()).with_cache(context.clone());
        self.cache = Some(context);
        self
    }

    /// A transport backed by the cache database at
    /// [`Config::cache_path`], created if it does not exist yet.
    pub async fn open(store: StoreHandle, config: Config, collection: impl Into<String>) -> Result<Self> {
        let path = config.cache_path().or_raise(|| ErrorKind::Cache)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Cache)?;
        }
        let db = Database::connect(&path).await.or_raise(|| ErrorKind::Cache)?;
        tracing::info!(path = %path.display(), store = store.name(), "Opened cache");
        Ok(Self::new(store, config).with_cache(Cache::from(&db), collection))
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> Option<&CacheContext> {
        self.cache.as_ref()
    }

    /// Content digest of `bytes`, as the store identifies uploads.
    pub fn digest(bytes: &[u8]) -> Digest {
        digest_bytes(bytes)
    }

    /// Complete content of `object`, from the cache when possible.
    pub async fn read_object(&self, object: ObjectId, total_size: u64, mime_type: Option<&str>) -> Result<Vec<u8>> {
        self.reader.read_object(object, total_size, mime_type).await.or_raise(|| ErrorKind::Read)
    }

    /// Start streaming an object into `sink`. On error, use
    /// [`read_object`](Self::read_object) instead.
    pub fn stream_object(&self, request: StreamRequest, sink: Box<dyn MediaSink>) -> Result<StreamHandle> {
        self.streams.start(request, sink).or_raise(|| ErrorKind::Stream)
    }

    pub fn plan_upload(&self, bytes: &[u8], mime_type: impl Into<String>) -> Result<UploadPlan> {
        upload::plan_upload(bytes, mime_type).or_raise(|| ErrorKind::Upload)
    }

    /// Upload `plan`, resuming the sender's upload of the same file if there
    /// is one. See [`UploadEvent`] for the order of events.
    pub fn upload<'a>(
        &'a self,
        plan: &'a UploadPlan,
        metadata: &'a SealMetadata,
    ) -> impl Stream<Item = Result<UploadEvent>> + 'a {
        stream! {
            for await event in upload::upload(&self.store, &self.config.upload, plan, metadata) {
                yield event.or_raise(|| ErrorKind::Upload);
            }
        }
    }

    pub async fn upload_phase(&self, digest: &Digest, owner: &Address) -> Result<UploadPhase> {
        upload::phase(&self.store, digest, owner).await.or_raise(|| ErrorKind::Upload)
    }

    pub async fn abandon(&self, digest: &Digest) -> Result<Receipt> {
        upload::abandon(&self.store, digest).await.or_raise(|| ErrorKind::Upload)
    }

    /// Purge `owner`'s expired upload of `digest`. Returns the number of
    /// chunks deleted.
    pub async fn purge(&self, digest: &Digest, owner: &Address) -> Result<u64> {
        upload::purge(&self.store, digest, owner, self.config.upload.batch_limit()).await.or_raise(|| ErrorKind::Upload)
    }

    /// Empty every cache tier. Returns the number of records removed.
    pub async fn clear_cache(&self) -> Result<u64> {
        let Some(context) = &self.cache else {
            return Ok(0);
        };
        let removed = context.cache.clear().await.or_raise(|| ErrorKind::Cache)?;
        tracing::info!(removed, "Cleared cache");
        Ok(removed)
    }
}
