//! Store models.
//!
//! These types mirror the values exchanged with the remote contract. They are
//! plain data: no validation happens here beyond what the types enforce.

use inscribe_chunk::Digest;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Blocks of inactivity after which an upload may be purged by anyone.
pub const UPLOAD_EXPIRY_BLOCKS: u64 = 4320;

/// Identifier of a sealed object (token id) on the remote store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);
impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}
impl From<u64> for ObjectId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Account address as the remote store prints it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);
impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}
impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// Acknowledgement of an accepted state-changing call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub tx_id: String,
}

/// Remote progress of a multi-transaction upload, keyed by
/// `(digest, owner)`.
///
/// `running_hash` is the fold of chunks `[0, current_index)`, so
/// `current_index <= total_chunks` always holds for state produced by a
/// well-behaved store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadState {
    pub mime_type: String,
    pub total_size: u64,
    pub total_chunks: u64,
    pub current_index: u64,
    pub running_hash: Digest,
    /// First pending chunk index not yet purged.
    pub purge_index: u64,
    /// Block height of the last accepted call for this upload.
    pub last_touched: u64,
}
impl UploadState {
    /// Every chunk has been accepted; only sealing remains.
    pub fn is_complete(&self) -> bool {
        self.current_index >= self.total_chunks
    }

    pub fn remaining_chunks(&self) -> u64 {
        self.total_chunks.saturating_sub(self.current_index)
    }

    /// No call has touched the upload for more than [`UPLOAD_EXPIRY_BLOCKS`]
    /// as of block height `block`.
    pub fn is_expired_at(&self, block: u64) -> bool {
        block.saturating_sub(self.last_touched) > UPLOAD_EXPIRY_BLOCKS
    }
}

/// Arguments for opening a new upload slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BeginUpload {
    pub mime_type: String,
    pub total_size: u64,
    pub total_chunks: u64,
}

/// Metadata attached when an upload is sealed into an object.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SealMetadata {
    /// Must not be empty.
    pub token_uri: String,
    /// Previously sealed objects this one references.
    pub dependencies: Vec<ObjectId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_state_progress() {
        let mut state = UploadState {
            mime_type: "image/png".to_string(),
            total_size: 40_000,
            total_chunks: 3,
            current_index: 1,
            running_hash: Digest::default(),
            purge_index: 0,
            last_touched: 7,
        };
        assert_eq!(state.remaining_chunks(), 2);
        assert!(!state.is_complete());
        state.current_index = 3;
        assert_eq!(state.remaining_chunks(), 0);
        assert!(state.is_complete());
        assert!(!state.is_expired_at(7 + UPLOAD_EXPIRY_BLOCKS));
        assert!(state.is_expired_at(8 + UPLOAD_EXPIRY_BLOCKS));
    }

    #[test]
    fn display() {
        assert_eq!(ObjectId(42).to_string(), "42");
        assert_eq!(Address::from("SP2ABC").to_string(), "SP2ABC");
    }
}
