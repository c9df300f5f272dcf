//! Chunking and content digests for the inscription protocol.
//!
//! Content is split into fixed-size chunks of at most [`CHUNK_SIZE`] bytes and
//! identified by a single [`Digest`], produced by folding each chunk in order
//! through SHA-256:
//!
//! ```text
//! running[0] = [0u8; 32]
//! running[i] = sha256(running[i - 1] || chunk[i])
//! ```
//!
//! The final running value is both the content address of the object and the
//! checkpoint the remote store verifies after every accepted batch. Because
//! every step depends on the previous one, reordering, truncating or
//! corrupting any chunk changes every subsequent value.
//!
//! This crate is pure: no I/O, no async, no allocation beyond the chunks
//! themselves.

mod codec;
pub mod error;
mod hash;
pub mod mime;

pub use crate::codec::{batch, expected_chunk_count, split, total_chunks};
pub use crate::hash::{Digest, RunningHash, digest, digest_bytes};

/// Maximum number of bytes in a single chunk.
pub const CHUNK_SIZE: usize = 16_384;
/// Maximum number of chunks the remote store accepts (or returns) per call.
pub const MAX_BATCH_SIZE: usize = 50;
/// Seed value of the running hash, before any chunk has been folded in.
pub const EMPTY_HASH: [u8; 32] = [0u8; 32];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_hash_is_digest_of_nothing() {
        let chunks: [&[u8]; 0] = [];
        assert_eq!(digest(chunks).as_bytes(), &EMPTY_HASH);
    }
}
