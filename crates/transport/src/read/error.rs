//! Error types for the [`read`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.

use derive_more::{Display, Error};
use inscribe_store::ObjectId;

/// A read error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for read operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a read failed.
///
/// ### Integrity Errors
/// - [`ErrorKind::MissingChunk`]
/// - [`ErrorKind::Truncated`]
///
/// ### Per-attempt Errors
/// These are retried and only surface inside an integrity error's tree.
/// - [`ErrorKind::EmptyChunk`]
/// - [`ErrorKind::Store`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A chunk could not be fetched within its retry budget. The whole read
    /// failed; no partial object is returned.
    #[display("chunk {index} of object {object} is missing")]
    MissingChunk { object: ObjectId, index: u64 },
    /// The store answered without content for a chunk.
    #[display("store returned no content for the chunk")]
    EmptyChunk,
    /// Every chunk arrived but together they are shorter than the object's
    /// declared size.
    #[display("object assembled to {actual} bytes but {expected} were declared")]
    Truncated { expected: u64, actual: u64 },
    /// A call to the [remote store](inscribe_store::ChunkStore) failed.
    #[display("store request failed")]
    Store,
    /// The object cannot be held in memory on this platform.
    #[display("object of {_0} bytes is too large to read")]
    TooLarge(#[error(not(source))] u64),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::EmptyChunk | Self::Store | Self::MissingChunk { .. } => true,
            Self::Truncated { .. } | Self::TooLarge(_) => false,
        }
    }
}
