use crate::upload::error::{ErrorKind, Result};
use inscribe_chunk::{CHUNK_SIZE, Digest, RunningHash, split};
use inscribe_store::{BeginUpload, UploadState};

/// A file prepared for upload: its chunks and the digest that identifies it
/// in every call to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadPlan {
    pub digest: Digest,
    pub mime_type: String,
    pub total_size: u64,
    pub chunks: Vec<Vec<u8>>,
}
impl UploadPlan {
    pub fn total_chunks(&self) -> u64 {
        self.chunks.len() as u64
    }

    pub(crate) fn begin(&self) -> BeginUpload {
        BeginUpload { mime_type: self.mime_type.clone(), total_size: self.total_size, total_chunks: self.total_chunks() }
    }

    /// Check that the remote `state` belongs to this file and work out what
    /// is left to submit in batches of `batch_limit` chunks.
    ///
    /// # Errors
    /// - [`Desync`](ErrorKind::Desync) if the remote has accepted more chunks
    ///   than the file has.
    /// - [`ResumeMismatch`](ErrorKind::ResumeMismatch) if the remote upload
    ///   was started with a different MIME type, size or chunk count.
    pub fn check_resumable(&self, state: &UploadState, batch_limit: usize) -> Result<ResumeInfo> {
        let local = self.total_chunks();
        if state.current_index > local {
            exn::bail!(ErrorKind::Desync { remote: state.current_index, local });
        }
        if state.mime_type != self.mime_type {
            exn::bail!(ErrorKind::ResumeMismatch("mime type"));
        }
        if state.total_size != self.total_size {
            exn::bail!(ErrorKind::ResumeMismatch("total size"));
        }
        if state.total_chunks != local {
            exn::bail!(ErrorKind::ResumeMismatch("chunk count"));
        }
        let batch_limit = batch_limit.max(1);
        let remaining_chunks = state.remaining_chunks();
        Ok(ResumeInfo {
            current_index: state.current_index,
            total_chunks: local,
            remaining_chunks,
            remaining_batches: remaining_chunks.div_ceil(batch_limit as u64),
            batch_limit,
        })
    }
}

/// Chunk and digest a file.
///
/// # Errors
/// [`EmptyUpload`](ErrorKind::EmptyUpload) for a file without content.
pub fn plan_upload(bytes: &[u8], mime_type: impl Into<String>) -> Result<UploadPlan> {
    let chunks: Vec<Vec<u8>> = split(bytes, CHUNK_SIZE).into_iter().map(<[u8]>::to_vec).collect();
    if chunks.is_empty() {
        exn::bail!(ErrorKind::EmptyUpload);
    }
    let mut running = RunningHash::new();
    for chunk in &chunks {
        running.update(chunk);
    }
    let plan = UploadPlan { digest: running.finish(), mime_type: mime_type.into(), total_size: bytes.len() as u64, chunks };
    tracing::debug!(digest = %plan.digest, chunks = plan.total_chunks(), total_size = plan.total_size, "Planned upload");
    Ok(plan)
}

/// Where a remote upload stands relative to its file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResumeInfo {
    /// Index of the next chunk the store expects.
    pub current_index: u64,
    pub total_chunks: u64,
    pub remaining_chunks: u64,
    pub remaining_batches: u64,
    pub batch_limit: usize,
}

/// Remote lifecycle of an upload slot.
///
/// Sealed and abandoned-then-purged uploads have no remote state and show up
/// as [`NotStarted`](Self::NotStarted).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadPhase {
    NotStarted,
    InProgress,
    /// Inactive for too long: anyone may purge it, and the owner can no
    /// longer submit to it.
    Expired,
}
impl UploadPhase {
    /// Classify remote state. Without a known block height an existing
    /// upload is assumed to still be in progress.
    pub fn classify(state: Option<&UploadState>, block_height: Option<u64>) -> Self {
        match (state, block_height) {
            (None, _) => Self::NotStarted,
            (Some(state), Some(block)) if state.is_expired_at(block) => Self::Expired,
            (Some(_), _) => Self::InProgress,
        }
    }
}
