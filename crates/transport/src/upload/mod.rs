//! Resumable multi-transaction uploads.
//!
//! A file is split into chunks and identified by the running hash over them
//! ([`plan_upload`]). The store keeps one in-progress upload per
//! `(digest, owner)`; [`upload`] picks it up wherever it stopped, so a
//! dropped connection or a closed tab never costs more than the batch that
//! was in flight.
//!
//! Uploads that see no activity for long enough expire. The owner can give
//! up on one early with [`abandon`]; anyone can then [`purge`] its pending
//! chunks, which frees the slot for a fresh upload.

pub mod error;
mod plan;
mod stream;

pub use crate::upload::plan::{ResumeInfo, UploadPhase, UploadPlan, plan_upload};
pub use crate::upload::stream::{UploadEvent, resume, upload};
use crate::upload::error::{ErrorKind, Result};
use inscribe_chunk::{Digest, batch};
use inscribe_store::error::ErrorKind as StoreErrorKind;
use inscribe_store::{Address, Receipt, StoreHandle};

/// Where `owner`'s upload of `digest` stands.
pub async fn phase(store: &StoreHandle, digest: &Digest, owner: &Address) -> Result<UploadPhase> {
    let state = store.get_upload_state(digest, owner, store.sender()).await.map_err(ErrorKind::store)?;
    if state.is_none() {
        return Ok(UploadPhase::NotStarted);
    }
    let block_height = match store.block_height().await {
        Ok(height) => Some(height),
        Err(e) if matches!(&*e, StoreErrorKind::Unsupported(_)) => None,
        Err(e) => return Err(ErrorKind::store(e)),
    };
    Ok(UploadPhase::classify(state.as_ref(), block_height))
}

/// Give up on the sender's upload of `digest`. Its chunks stay on the store
/// until they are [purged](purge).
///
/// # Errors
/// - [`NoUploadState`](ErrorKind::NoUploadState) if the sender has no upload
///   of `digest` in progress.
/// - [`NotOwner`](ErrorKind::NotOwner) if the store refuses the sender.
pub async fn abandon(store: &StoreHandle, digest: &Digest) -> Result<Receipt> {
    let owner = store.sender();
    if store.get_upload_state(digest, owner, owner).await.map_err(ErrorKind::store)?.is_none() {
        exn::bail!(ErrorKind::NoUploadState);
    }
    let receipt = store.abandon_upload(digest).await.map_err(ErrorKind::store)?;
    tracing::info!(%digest, tx = %receipt.tx_id, "Abandoned upload");
    Ok(receipt)
}

/// Delete the pending chunks of `owner`'s expired upload of `digest`, in
/// batches of up to `batch_limit` chunks starting at the remote purge index.
/// Returns the number of chunks purged.
///
/// # Errors
/// - [`NoUploadState`](ErrorKind::NoUploadState) if there is nothing to
///   purge.
/// - [`NotExpired`](ErrorKind::NotExpired) if the upload is still active.
///   Batches purged before a failure stay purged; calling again continues
///   from there.
pub async fn purge(store: &StoreHandle, digest: &Digest, owner: &Address, batch_limit: usize) -> Result<u64> {
    let Some(state) = store.get_upload_state(digest, owner, store.sender()).await.map_err(ErrorKind::store)? else {
        exn::bail!(ErrorKind::NoUploadState);
    };
    let pending: Vec<u64> = (state.purge_index..state.total_chunks).collect();
    let mut purged = 0;
    for indices in batch(&pending, batch_limit) {
        let receipt = store.purge_expired(digest, owner, indices).await.map_err(ErrorKind::store)?;
        purged += indices.len() as u64;
        tracing::debug!(%digest, %owner, purged, of = pending.len(), tx = %receipt.tx_id, "Purged chunks");
    }
    tracing::info!(%digest, %owner, purged, "Purged upload");
    Ok(purged)
}
