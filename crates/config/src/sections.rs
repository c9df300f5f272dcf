use inscribe_chunk::MAX_BATCH_SIZE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const MIB: u64 = 1024 * 1024;

/// Settings for reading whole objects from the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Chunks requested per batch read (clamped to the protocol maximum).
    pub batch_size: usize,
    /// Single-chunk fetches in flight at once.
    pub concurrency: usize,
    /// Retries of a single chunk fetch before the read fails.
    pub chunk_retries: u32,
    /// Retries of a batch read before it is classified as failed.
    pub batch_retries: u32,
    /// First backoff delay; doubles with every retry.
    pub backoff_base_ms: u64,
}
impl Default for ReaderConfig {
    fn default() -> Self {
        Self { batch_size: 4, concurrency: 4, chunk_retries: 3, batch_retries: 2, backoff_base_ms: 400 }
    }
}
impl ReaderConfig {
    #[must_use]
    pub fn batch_limit(&self) -> usize {
        self.batch_size.clamp(1, MAX_BATCH_SIZE)
    }

    #[must_use]
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

/// Settings for progressive streaming into a playback sink.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Chunks fetched per step while streaming.
    pub batch_size: usize,
    /// Buffered playback, in seconds, at which the stream becomes playable.
    pub target_buffer_secs: f64,
    /// Upper bound on chunks fetched before the stream becomes playable.
    pub max_initial_chunks: u64,
    pub sink_open_timeout_ms: u64,
    pub append_timeout_ms: u64,
    /// Delay before loading the remainder when playback has not started.
    pub lazy_load_delay_ms: u64,
}
impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            batch_size: 4,
            target_buffer_secs: 10.0,
            max_initial_chunks: 24,
            sink_open_timeout_ms: 3000,
            append_timeout_ms: 5000,
            lazy_load_delay_ms: 5000,
        }
    }
}
impl StreamConfig {
    #[must_use]
    pub fn batch_limit(&self) -> usize {
        self.batch_size.clamp(1, MAX_BATCH_SIZE)
    }

    #[must_use]
    pub fn sink_open_timeout(&self) -> Duration {
        Duration::from_millis(self.sink_open_timeout_ms)
    }

    #[must_use]
    pub fn append_timeout(&self) -> Duration {
        Duration::from_millis(self.append_timeout_ms)
    }

    #[must_use]
    pub fn lazy_load_delay(&self) -> Duration {
        Duration::from_millis(self.lazy_load_delay_ms)
    }
}

/// Settings for multi-transaction uploads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Chunks submitted per transaction (clamped to the protocol maximum).
    pub batch_size: usize,
    /// Retries of a batch submission that failed with a retryable error.
    pub submit_retries: u32,
}
impl Default for UploadConfig {
    fn default() -> Self {
        Self { batch_size: 30, submit_retries: 3 }
    }
}
impl UploadConfig {
    #[must_use]
    pub fn batch_limit(&self) -> usize {
        self.batch_size.clamp(1, MAX_BATCH_SIZE)
    }
}

/// Settings for the local cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// SQLite database location; the platform cache directory when unset.
    pub path: Option<PathBuf>,
    pub temp_ttl_secs: u64,
    /// Largest object kept in the temporary tier.
    pub temp_max_object_bytes: u64,
    /// Total bytes the temporary tier may hold.
    pub temp_budget_bytes: u64,
    pub thumbnail_limit: u64,
    /// Audio/video at or below this size is cached permanently; larger media
    /// only temporarily.
    pub auto_preview_max_bytes: u64,
}
impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: None,
            temp_ttl_secs: 24 * 60 * 60,
            temp_max_object_bytes: 25 * MIB,
            temp_budget_bytes: 256 * MIB,
            thumbnail_limit: 1000,
            auto_preview_max_bytes: 256 * 1024,
        }
    }
}
impl CacheConfig {
    #[must_use]
    pub fn temp_ttl(&self) -> Duration {
        Duration::from_secs(self.temp_ttl_secs)
    }
}
