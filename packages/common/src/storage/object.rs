use async_trait::async_trait;
use futures::TryStreamExt;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};
use tokio_util::io::StreamReader;

use super::error::BlobError;
use super::traits::{BlobSource, BoxReader};
use crate::config::ObjectStoreConfig;

/// Blob source for S3-compatible object stores (S3, Glacier restores, GCS
/// interop, B2, gateways).
pub struct ObjectStoreSource {
    bucket: Box<Bucket>,
    prefix: String,
}

impl ObjectStoreSource {
    pub fn new(config: &ObjectStoreConfig) -> Result<Self, BlobError> {
        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse()
                .map_err(|e| BlobError::Backend(format!("invalid region: {e}")))?,
        };

        let credentials = Credentials::new(
            config.access_key.as_deref(),
            config.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| BlobError::Backend(format!("invalid credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| BlobError::Backend(e.to_string()))?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self {
            bucket,
            prefix: config.prefix.trim_matches('/').to_string(),
        })
    }

    /// Object key for a stored path.
    fn key(&self, path: &str) -> Result<String, BlobError> {
        let trimmed = path.trim().trim_start_matches('/');
        if trimmed.is_empty() {
            return Err(BlobError::InvalidPath("path cannot be empty".into()));
        }
        if self.prefix.is_empty() {
            Ok(trimmed.to_string())
        } else {
            Ok(format!("{}/{}", self.prefix, trimmed))
        }
    }
}

fn map_s3_error(key: &str, err: S3Error) -> BlobError {
    match err {
        S3Error::HttpFailWithBody(404, _) => BlobError::NotFound(key.to_string()),
        other => BlobError::Backend(other.to_string()),
    }
}

fn check_status(key: &str, status: u16) -> Result<(), BlobError> {
    match status {
        200..=299 => Ok(()),
        404 => Err(BlobError::NotFound(key.to_string())),
        other => Err(BlobError::Backend(format!(
            "unexpected status {other} for {key}"
        ))),
    }
}

#[async_trait]
impl BlobSource for ObjectStoreSource {
    async fn open(&self, path: &str) -> Result<BoxReader, BlobError> {
        let key = self.key(path)?;
        let response = self
            .bucket
            .get_object_stream(&key)
            .await
            .map_err(|e| map_s3_error(&key, e))?;
        check_status(&key, response.status_code)?;

        let stream = response.bytes.map_err(std::io::Error::other);
        Ok(Box::new(StreamReader::new(stream)))
    }

    async fn size(&self, path: &str) -> Result<u64, BlobError> {
        let key = self.key(path)?;
        let (head, status) = self
            .bucket
            .head_object(&key)
            .await
            .map_err(|e| map_s3_error(&key, e))?;
        check_status(&key, status)?;

        head.content_length
            .and_then(|len| u64::try_from(len).ok())
            .ok_or_else(|| BlobError::Backend(format!("no content length for {key}")))
    }
}
