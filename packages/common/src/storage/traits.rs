use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::BlobError;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Read access to wherever a record's bytes physically live.
///
/// Paths are the record's `stored_path`, interpreted by each adapter.
#[async_trait]
pub trait BlobSource: Send + Sync {
    /// Open the blob as a streaming async reader.
    async fn open(&self, path: &str) -> Result<BoxReader, BlobError>;

    /// Get the size of a blob in bytes.
    async fn size(&self, path: &str) -> Result<u64, BlobError>;

    /// Check whether a blob exists.
    async fn exists(&self, path: &str) -> Result<bool, BlobError> {
        match self.size(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Retrieve all bytes for a blob. Only suitable for small blobs.
    async fn read_all(&self, path: &str) -> Result<Vec<u8>, BlobError> {
        let mut reader = self.open(path).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }
}
