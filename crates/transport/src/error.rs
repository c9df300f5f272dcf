//! Transport Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Each component module ([`read`],
//! [`upload`], [`stream`]) has its own error kinds; the [`Transport`] facade
//! wraps them in the kind of the operation that failed.
//!
//! [`read`]: crate::read
//! [`upload`]: crate::upload
//! [`stream`]: crate::stream
//! [`Transport`]: crate::Transport

use derive_more::{Display, Error};

/// A transport error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// An object could not be read. The error tree names the chunk or store
    /// call that failed.
    #[display("could not read object")]
    Read,
    #[display("upload failed")]
    Upload,
    /// Streaming could not start. Read the object in full instead.
    #[display("could not stream object")]
    Stream,
    /// The cache database could not be opened.
    #[display("cache unavailable")]
    Cache,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Read => true,
            Self::Upload | Self::Stream | Self::Cache => false,
        }
    }
}
