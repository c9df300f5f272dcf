//! Store Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Remote rejections carry the contract's numeric error code where one is
//! known ([`ContractError`]). Resource/cost exhaustion has its own kind,
//! [`ErrorKind::CostExceeded`], because readers react to it by shrinking
//! their batches rather than failing.

use derive_more::{Display, Error};

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Message fragment some nodes use to report an exhausted read budget
/// instead of a structured error.
const COST_EXCEEDED_MARKER: &str = "costbalanceexceeded";

/// Errors raised by the remote contract, identified by their on-chain code.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum ContractError {
    #[display("ERR_NOT_AUTHORIZED (u100)")]
    NotAuthorized,
    #[display("ERR_NOT_FOUND (u101)")]
    NotFound,
    #[display("ERR_INVALID_BATCH (u102)")]
    InvalidBatch,
    #[display("ERR_HASH_MISMATCH (u103)")]
    HashMismatch,
    #[display("ERR_ALREADY_SEALED (u104)")]
    AlreadySealed,
    #[display("ERR_METADATA_FROZEN (u105)")]
    MetadataFrozen,
    #[display("ERR_WRONG_INDEX (u106)")]
    WrongIndex,
    #[display("ERR_INVALID_URI (u107)")]
    InvalidUri,
    #[display("ERR_PAUSED (u109)")]
    Paused,
    #[display("ERR_INVALID_FEE (u110)")]
    InvalidFee,
    #[display("ERR_DEPENDENCY_MISSING (u111)")]
    DependencyMissing,
    #[display("ERR_UPLOAD_EXPIRED (u112)")]
    UploadExpired,
    #[display("ERR_NOT_EXPIRED (u113)")]
    NotExpired,
    #[display("ERR_DUPLICATE (u114)")]
    Duplicate,
    #[display("unknown contract error (u{_0})")]
    Unknown(u32),
}
impl ContractError {
    #[must_use]
    pub fn from_code(code: u32) -> Self {
        match code {
            100 => Self::NotAuthorized,
            101 => Self::NotFound,
            102 => Self::InvalidBatch,
            103 => Self::HashMismatch,
            104 => Self::AlreadySealed,
            105 => Self::MetadataFrozen,
            106 => Self::WrongIndex,
            107 => Self::InvalidUri,
            109 => Self::Paused,
            110 => Self::InvalidFee,
            111 => Self::DependencyMissing,
            112 => Self::UploadExpired,
            113 => Self::NotExpired,
            114 => Self::Duplicate,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub fn code(&self) -> u32 {
        match self {
            Self::NotAuthorized => 100,
            Self::NotFound => 101,
            Self::InvalidBatch => 102,
            Self::HashMismatch => 103,
            Self::AlreadySealed => 104,
            Self::MetadataFrozen => 105,
            Self::WrongIndex => 106,
            Self::InvalidUri => 107,
            Self::Paused => 109,
            Self::InvalidFee => 110,
            Self::DependencyMissing => 111,
            Self::UploadExpired => 112,
            Self::NotExpired => 113,
            Self::Duplicate => 114,
            Self::Unknown(code) => *code,
        }
    }
}

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The requested read was too expensive for the remote to serve. Ask for
    /// less at once.
    #[display("read cost exceeded")]
    CostExceeded,
    /// The contract rejected the call with a known error code.
    #[display("contract error: {_0}")]
    Contract(#[error(not(source))] ContractError),
    /// Transport-level failure talking to the remote node.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The remote rejected the call without a structured error code.
    #[display("rejected: {_0}")]
    Rejected(#[error(not(source))] String),
    /// The request was malformed before it reached the remote (e.g. an
    /// oversized batch).
    #[display("invalid request: {_0}")]
    InvalidRequest(#[error(not(source))] String),
    /// The store does not implement this optional capability.
    #[display("unsupported operation: {_0}")]
    Unsupported(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Rejected(_))
    }

    /// Returns `true` if the remote refused because the request was too
    /// expensive.
    ///
    /// Prefers the structured [`CostExceeded`](Self::CostExceeded) kind, but
    /// also recognises unstructured rejections whose message names the
    /// exhausted cost balance.
    pub fn is_cost_exceeded(&self) -> bool {
        match self {
            Self::CostExceeded => true,
            Self::Network(message) | Self::Rejected(message) => {
                message.to_ascii_lowercase().contains(COST_EXCEEDED_MARKER)
            },
            _ => false,
        }
    }

    /// The contract error code, if the remote supplied one.
    pub fn contract(&self) -> Option<ContractError> {
        match self {
            Self::Contract(err) => Some(*err),
            _ => None,
        }
    }
}
impl From<ContractError> for ErrorKind {
    fn from(err: ContractError) -> Self {
        Self::Contract(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_codes_round_trip() {
        for code in [100, 101, 102, 103, 104, 105, 106, 107, 109, 110, 111, 112, 113, 114, 999] {
            assert_eq!(ContractError::from_code(code).code(), code);
        }
        assert_eq!(ContractError::from_code(108), ContractError::Unknown(108));
    }

    #[test]
    fn cost_exceeded_detection() {
        assert!(ErrorKind::CostExceeded.is_cost_exceeded());
        assert!(ErrorKind::Rejected("Runtime(CostBalanceExceeded(...))".to_string()).is_cost_exceeded());
        assert!(!ErrorKind::Rejected("timeout".to_string()).is_cost_exceeded());
        assert!(!ErrorKind::Contract(ContractError::InvalidBatch).is_cost_exceeded());
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Network("reset".to_string()).is_retryable());
        assert!(!ErrorKind::CostExceeded.is_retryable());
        assert!(!ErrorKind::Contract(ContractError::HashMismatch).is_retryable());
        assert!(!ErrorKind::Unsupported("batch").is_retryable());
        assert!(!ErrorKind::InvalidRequest("too many".to_string()).is_retryable());
    }

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::Contract(ContractError::HashMismatch).to_string(),
            "contract error: ERR_HASH_MISMATCH (u103)"
        );
    }
}
