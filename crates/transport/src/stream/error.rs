//! Error types for the [`stream`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.

use derive_more::{Display, Error};

/// A streaming error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for streaming operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why streaming stopped.
///
/// ### Fallback Errors
/// Streaming cannot work for this object or sink; read the whole object
/// instead (see [`ErrorKind::forces_full_load`]).
/// - [`ErrorKind::InvalidShape`]
/// - [`ErrorKind::Negotiation`]
/// - [`ErrorKind::SinkTimeout`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The sink accepted none of the candidate formats derived from the
    /// declared MIME type.
    #[display("no supported stream format for {_0:?}")]
    Negotiation(#[error(not(source))] String),
    /// A sink operation did not finish in time.
    #[display("sink {_0} timed out")]
    SinkTimeout(#[error(not(source))] &'static str),
    #[display("sink rejected data")]
    Sink,
    /// Chunks could not be fetched from the store.
    #[display("could not fetch chunks")]
    Read,
    #[display("stream cancelled")]
    Cancelled,
    /// The object cannot be streamed at all.
    #[display("object cannot be streamed: {_0}")]
    InvalidShape(#[error(not(source))] &'static str),
    /// The streaming task panicked or was aborted.
    #[display("stream task stopped unexpectedly")]
    Task,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Read | Self::Sink | Self::SinkTimeout(_))
    }

    /// Whether the caller should give up on streaming and read the object in
    /// full, regardless of how much was already played.
    pub fn forces_full_load(&self) -> bool {
        matches!(self, Self::InvalidShape(_) | Self::Negotiation(_) | Self::SinkTimeout(_))
    }
}
