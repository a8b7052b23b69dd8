use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::checksum::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_UPLOAD_BYTES};
use crate::status::{ChecksumKind, LocationKind};

/// Checksum and verification settings.
#[derive(Debug, Deserialize, Clone)]
pub struct IntegrityConfig {
    /// Upload-time size ceiling in bytes. Default: 10 GiB.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    /// Read chunk size in bytes. Default: 8192.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Maximum concurrent verifications in a batch. Default: 4.
    #[serde(default = "default_verify_concurrency")]
    pub verify_concurrency: usize,
    /// Per-blob read timeout in seconds; 0 disables. Default: 300.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    /// Digest compared when a caller does not choose one. Default: sha256.
    #[serde(default)]
    pub default_checksum: ChecksumKind,
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}
fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_verify_concurrency() -> usize {
    4
}
fn default_read_timeout_secs() -> u64 {
    300
}

impl IntegrityConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_secs > 0).then(|| Duration::from_secs(self.read_timeout_secs))
    }
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            chunk_size: default_chunk_size(),
            verify_concurrency: default_verify_concurrency(),
            read_timeout_secs: default_read_timeout_secs(),
            default_checksum: ChecksumKind::default(),
        }
    }
}

/// A directory tree served as a blob source.
#[derive(Debug, Deserialize, Clone)]
pub struct FilesystemConfig {
    pub root: PathBuf,
}

/// An S3-compatible bucket served as a blob source.
#[derive(Debug, Deserialize, Clone)]
pub struct ObjectStoreConfig {
    pub bucket: String,
    /// Default: "us-east-1".
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for non-AWS providers.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Use path-style addressing (MinIO and most gateways). Default: false.
    #[serde(default)]
    pub path_style: bool,
    /// Key prefix prepended to every stored path.
    #[serde(default)]
    pub prefix: String,
}

fn default_region() -> String {
    "us-east-1".into()
}

/// Blob source per location kind. Unset kinds have no adapter.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub local: Option<FilesystemConfig>,
    #[serde(default)]
    pub nas: Option<FilesystemConfig>,
    #[serde(default)]
    pub other: Option<FilesystemConfig>,
    #[serde(default)]
    pub s3: Option<ObjectStoreConfig>,
    #[serde(default)]
    pub glacier: Option<ObjectStoreConfig>,
    #[serde(default)]
    pub gcs: Option<ObjectStoreConfig>,
    #[serde(default)]
    pub azure: Option<ObjectStoreConfig>,
    #[serde(default)]
    pub backblaze: Option<ObjectStoreConfig>,
}

impl StorageConfig {
    pub fn filesystem_backends(&self) -> impl Iterator<Item = (LocationKind, &FilesystemConfig)> {
        [
            (LocationKind::Local, self.local.as_ref()),
            (LocationKind::Nas, self.nas.as_ref()),
            (LocationKind::Other, self.other.as_ref()),
        ]
        .into_iter()
        .filter_map(|(kind, cfg)| cfg.map(|c| (kind, c)))
    }

    pub fn object_backends(&self) -> impl Iterator<Item = (LocationKind, &ObjectStoreConfig)> {
        [
            (LocationKind::S3, self.s3.as_ref()),
            (LocationKind::Glacier, self.glacier.as_ref()),
            (LocationKind::Gcs, self.gcs.as_ref()),
            (LocationKind::Azure, self.azure.as_ref()),
            (LocationKind::Backblaze, self.backblaze.as_ref()),
        ]
        .into_iter()
        .filter_map(|(kind, cfg)| cfg.map(|c| (kind, c)))
    }
}
