use std::io;

use md5::Md5;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::digest::{Md5Digest, Sha256Digest};
use crate::status::ChecksumKind;

/// Read granularity. Memory use is bounded by one chunk regardless of file size.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Default ceiling for upload-time sources (10 GiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024 * 1024;

/// Both fingerprints of a byte source plus the number of bytes actually read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Fingerprint {
    pub md5: Md5Digest,
    pub sha256: Sha256Digest,
    pub total_bytes: u64,
}

impl Fingerprint {
    /// Hex rendering of the digest of the given kind.
    pub fn hex(&self, kind: ChecksumKind) -> String {
        match kind {
            ChecksumKind::Md5 => self.md5.to_hex(),
            ChecksumKind::Sha256 => self.sha256.to_hex(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    /// The source could not be read to the end. No partial digest survives.
    #[error("source unreadable: {0}")]
    Unreadable(#[from] io::Error),

    #[error("source exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },
}

/// Single-pass MD5 + SHA-256 calculator over an async byte source.
#[derive(Debug, Clone, Copy)]
pub struct ChecksumCalculator {
    chunk_size: usize,
    max_bytes: Option<u64>,
}

impl Default for ChecksumCalculator {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_bytes: None,
        }
    }
}

impl ChecksumCalculator {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            max_bytes: None,
        }
    }

    /// Enforce a size ceiling. Used on the upload path only.
    pub fn with_limit(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    /// Reject a source whose size is known up front, before any byte is read.
    pub fn check_declared_size(&self, declared: u64) -> Result<(), ChecksumError> {
        match self.max_bytes {
            Some(limit) if declared > limit => Err(ChecksumError::SizeLimitExceeded {
                actual: declared,
                limit,
            }),
            _ => Ok(()),
        }
    }

    /// Stream `reader` to the end exactly once, feeding every chunk into both
    /// accumulators.
    pub async fn calculate<R>(&self, reader: &mut R) -> Result<Fingerprint, ChecksumError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut md5 = Md5::new();
        let mut sha256 = Sha256::new();
        let mut total_bytes: u64 = 0;
        let mut buf = vec![0u8; self.chunk_size];

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ChecksumError::Unreadable(e)),
            };

            total_bytes += n as u64;
            if let Some(limit) = self.max_bytes
                && total_bytes > limit
            {
                return Err(ChecksumError::SizeLimitExceeded {
                    actual: total_bytes,
                    limit,
                });
            }

            md5.update(&buf[..n]);
            sha256.update(&buf[..n]);
        }

        Ok(Fingerprint {
            md5: Md5Digest::from_bytes(md5.finalize().into()),
            sha256: Sha256Digest::from_bytes(sha256.finalize().into()),
            total_bytes,
        })
    }

    /// Fingerprint an in-memory buffer.
    pub fn calculate_bytes(data: &[u8]) -> Fingerprint {
        Fingerprint {
            md5: Md5Digest::from_bytes(Md5::digest(data).into()),
            sha256: Sha256Digest::from_bytes(Sha256::digest(data).into()),
            total_bytes: data.len() as u64,
        }
    }
}
