use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use super::error::BlobError;
use super::filesystem::FilesystemSource;
use super::traits::{BlobSource, BoxReader};
use crate::config::StorageConfig;
use crate::status::LocationKind;

/// One blob source per location kind, selected by a record's `location_kind`
/// at call time.
#[derive(Clone, Default)]
pub struct BlobSources {
    sources: HashMap<LocationKind, Arc<dyn BlobSource>>,
}

impl BlobSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration.
    pub fn with(mut self, kind: LocationKind, source: Arc<dyn BlobSource>) -> Self {
        self.insert(kind, source);
        self
    }

    pub fn insert(&mut self, kind: LocationKind, source: Arc<dyn BlobSource>) {
        self.sources.insert(kind, source);
    }

    pub fn get(&self, kind: LocationKind) -> Result<&Arc<dyn BlobSource>, BlobError> {
        self.sources.get(&kind).ok_or(BlobError::Unsupported(kind))
    }

    pub fn is_configured(&self, kind: LocationKind) -> bool {
        self.sources.contains_key(&kind)
    }

    pub async fn open(&self, kind: LocationKind, path: &str) -> Result<BoxReader, BlobError> {
        self.get(kind)?.open(path).await
    }

    pub async fn size(&self, kind: LocationKind, path: &str) -> Result<u64, BlobError> {
        self.get(kind)?.size(path).await
    }

    /// Build adapters for every configured backend.
    pub fn from_config(config: &StorageConfig) -> Result<Self, BlobError> {
        let mut sources = Self::new();

        for (kind, fs_config) in config.filesystem_backends() {
            if !fs_config.root.exists() {
                warn!(location = %kind, root = %fs_config.root.display(), "Filesystem root does not exist");
            }
            info!(location = %kind, root = %fs_config.root.display(), "Filesystem blob source configured");
            sources.insert(kind, Arc::new(FilesystemSource::new(fs_config.root.clone())));
        }

        for (kind, object_config) in config.object_backends() {
            sources.insert(kind, object_source(kind, object_config)?);
        }

        Ok(sources)
    }
}

#[cfg(feature = "object-storage")]
fn object_source(
    kind: LocationKind,
    config: &crate::config::ObjectStoreConfig,
) -> Result<Arc<dyn BlobSource>, BlobError> {
    let source = super::object::ObjectStoreSource::new(config)?;
    info!(location = %kind, bucket = %config.bucket, "Object store blob source configured");
    Ok(Arc::new(source))
}

#[cfg(not(feature = "object-storage"))]
fn object_source(
    kind: LocationKind,
    _config: &crate::config::ObjectStoreConfig,
) -> Result<Arc<dyn BlobSource>, BlobError> {
    Err(BlobError::Backend(format!(
        "location '{kind}' needs the object-storage feature"
    )))
}
