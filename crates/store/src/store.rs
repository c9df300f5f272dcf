//! Remote chunk store capability.
//!
//! This module defines the `ChunkStore` trait: the narrow set of reads and
//! state-changing calls the transport layer needs from the remote contract.
//! Wallet authentication, transaction signing and fee estimation happen behind
//! an implementation of this trait and are invisible to callers.

use crate::error::{ErrorKind, Result};
use crate::models::{Address, BeginUpload, ObjectId, Receipt, SealMetadata, UploadState};
use async_trait::async_trait;
use inscribe_chunk::Digest;

/// Unified interface to a remote chunk store.
///
/// Reads (`get_*`) are free of side effects and may be issued concurrently.
/// State-changing calls are signed as [`sender()`](Self::sender) and must be
/// awaited in order by the caller; the store does not queue them.
///
/// # Examples
///
/// ```
/// use inscribe_store::{ChunkStore, ObjectId, error::Result};
///
/// async fn first_chunk_len(store: &dyn ChunkStore, object: ObjectId) -> Result<usize> {
///     let caller = store.sender().clone();
///     let chunk = store.get_chunk(object, 0, &caller).await?;
///     Ok(chunk.map(|bytes| bytes.len()).unwrap_or(0))
/// }
/// ```
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Name of the configured store (used for logging only).
    fn name(&self) -> &str;

    /// Address that state-changing calls are signed as.
    fn sender(&self) -> &Address;

    /// Whether [`get_chunk_batch()`](Self::get_chunk_batch) is available.
    /// Readers never attempt batched reads when this is `false`.
    fn supports_chunk_batch_read(&self) -> bool {
        false
    }

    /// Current block height of the remote chain, used to tell whether an
    /// upload has expired.
    ///
    /// The default implementation fails with
    /// [`Unsupported`](ErrorKind::Unsupported).
    async fn block_height(&self) -> Result<u64> {
        exn::bail!(ErrorKind::Unsupported("block_height"))
    }

    /// Read a single chunk of a sealed object.
    ///
    /// Returns `None` when the store has no chunk at that index (including
    /// for unknown objects).
    async fn get_chunk(&self, object: ObjectId, index: u64, caller: &Address) -> Result<Option<Vec<u8>>>;

    /// Read several chunks of a sealed object in one round-trip.
    ///
    /// The result is ordered like `indices`, but may be shorter than the
    /// request or contain `None` slots: stores are allowed to return partial
    /// batches. Requests that are too expensive to serve fail with
    /// [`CostExceeded`](ErrorKind::CostExceeded).
    ///
    /// The default implementation fails with
    /// [`Unsupported`](ErrorKind::Unsupported).
    async fn get_chunk_batch(
        &self,
        object: ObjectId,
        indices: &[u64],
        caller: &Address,
    ) -> Result<Vec<Option<Vec<u8>>>> {
        let _ = (object, indices, caller);
        exn::bail!(ErrorKind::Unsupported("get_chunk_batch"))
    }

    /// Read the in-progress upload state for `(digest, owner)`, if any.
    async fn get_upload_state(&self, digest: &Digest, owner: &Address, caller: &Address) -> Result<Option<UploadState>>;

    /// Open an upload slot for `digest` owned by the sender.
    async fn begin_upload(&self, digest: &Digest, upload: &BeginUpload) -> Result<Receipt>;

    /// Append the next consecutive chunks to the sender's upload of `digest`.
    async fn submit_chunk_batch(&self, digest: &Digest, chunks: &[Vec<u8>]) -> Result<Receipt>;

    /// Finalise a complete upload into a sealed object.
    ///
    /// Fails with a [`HashMismatch`](crate::error::ContractError::HashMismatch)
    /// contract error if the folded chunks do not produce `digest`.
    async fn seal_upload(&self, digest: &Digest, metadata: &SealMetadata) -> Result<ObjectId>;

    /// Give up on the sender's upload of `digest`, making it purgeable.
    async fn abandon_upload(&self, digest: &Digest) -> Result<Receipt>;

    /// Delete pending chunks of an expired or abandoned upload owned by
    /// `owner`. `indices` must start at the upload's
    /// [`purge_index`](UploadState::purge_index) and be consecutive; the
    /// upload state disappears once every pending chunk is gone.
    async fn purge_expired(&self, digest: &Digest, owner: &Address, indices: &[u64]) -> Result<Receipt>;
}
