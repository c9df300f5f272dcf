//! Error types for the [`upload`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.

use derive_more::{Display, Error};
use inscribe_chunk::Digest;
use inscribe_store::error::{ContractError, Error as StoreError};

/// An upload error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for upload operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why an upload operation failed.
///
/// ### Resume-blocking Errors
/// The remote upload cannot be continued with the selected file. Pick the
/// right file, or abandon the remote upload and start over.
/// - [`ErrorKind::ResumeMismatch`]
/// - [`ErrorKind::Desync`]
/// - [`ErrorKind::Expired`]
///
/// ### Integrity Errors
/// - [`ErrorKind::HashMismatch`]: restart or abandon the upload.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The file has no content. Rejected before any remote call.
    #[display("nothing to upload")]
    EmptyUpload,
    /// The remote upload was started for a different file.
    #[display("selected file does not match the in-progress upload ({_0} differs)")]
    ResumeMismatch(#[error(not(source))] &'static str),
    /// The remote upload claims more accepted chunks than the file has.
    #[display("remote upload is at chunk {remote} but the file only has {local} chunks")]
    Desync { remote: u64, local: u64 },
    /// The store refused to seal: the uploaded chunks do not fold to the
    /// file's digest.
    #[display("uploaded chunks do not hash to {_0}")]
    HashMismatch(#[error(not(source))] Digest),
    /// The upload belongs to another address.
    #[display("upload is owned by another address")]
    NotOwner,
    /// Purging was attempted before the upload expired.
    #[display("upload has not expired yet")]
    NotExpired,
    /// The upload went without activity for too long, or was abandoned. It
    /// can only be purged now.
    #[display("upload has expired")]
    Expired,
    #[display("no upload in progress")]
    NoUploadState,
    /// A call to the [remote store](inscribe_store::ChunkStore) failed.
    #[display("store request failed")]
    Store,
}

impl ErrorKind {
    /// Convert a store error into an upload error, classifying the contract
    /// codes callers can act on and keeping the store's `Exn` frame as a
    /// child in the error tree.
    #[track_caller]
    pub fn store(err: StoreError) -> Error {
        let kind = match err.contract() {
            Some(ContractError::UploadExpired) => Self::Expired,
            Some(ContractError::NotAuthorized) => Self::NotOwner,
            Some(ContractError::NotExpired) => Self::NotExpired,
            Some(ContractError::NotFound) => Self::NoUploadState,
            _ => Self::Store,
        };
        err.raise(kind)
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store)
    }
}
