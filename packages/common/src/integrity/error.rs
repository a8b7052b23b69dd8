use thiserror::Error;

use super::record::RecordId;
use super::store::StoreError;
use crate::checksum::ChecksumError;
use crate::status::IntegrityStatus;

/// Errors surfaced by integrity operations.
///
/// A checksum mismatch is not an error: it is the `corrupted` outcome.
#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("Integrity record not found: {0}")]
    NotFound(RecordId),

    #[error("Source unreadable: {0}")]
    UnreadableSource(String),

    #[error("Source exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },

    #[error("Integrity record {0} has no recorded checksums")]
    ChecksumNotComputed(RecordId),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: IntegrityStatus,
        to: IntegrityStatus,
    },

    #[error("{0}")]
    Validation(String),

    #[error("Batch must contain at least one record")]
    EmptyBatch,

    #[error("Record store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for IntegrityError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => IntegrityError::NotFound(id),
            other => IntegrityError::Store(other),
        }
    }
}

impl From<ChecksumError> for IntegrityError {
    fn from(err: ChecksumError) -> Self {
        match err {
            ChecksumError::Unreadable(e) => IntegrityError::UnreadableSource(e.to_string()),
            ChecksumError::SizeLimitExceeded { actual, limit } => {
                IntegrityError::SizeLimitExceeded { actual, limit }
            }
        }
    }
}
