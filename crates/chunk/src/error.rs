//! Chunk Error Types
//!
//! Chunking and folding operate on already-validated in-memory data and
//! cannot fail. The only fallible operation is parsing a [`Digest`](crate::Digest)
//! from text.

use derive_more::{Display, Error};

/// A chunk error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for chunk operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Text is not a 32-byte hex digest.
    #[display("invalid digest: {_0}")]
    InvalidDigest(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::InvalidDigest("zz".to_string()).to_string(), "invalid digest: zz");
        assert!(!ErrorKind::InvalidDigest(String::new()).is_retryable());
    }
}
