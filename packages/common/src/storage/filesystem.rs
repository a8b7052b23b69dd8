use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::BufReader;

use super::error::BlobError;
use super::traits::{BlobSource, BoxReader};

/// Filesystem-backed blob source for local disks and mounted network shares.
///
/// Stored paths are resolved beneath `root`: `/data/a.iso` with root
/// `/mnt/nas` reads `/mnt/nas/data/a.iso`. A root of `/` reads absolute
/// paths as-is.
pub struct FilesystemSource {
    root: PathBuf,
}

impl FilesystemSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a stored path onto the filesystem, refusing anything that would
    /// escape `root`.
    pub fn resolve(&self, stored_path: &str) -> Result<PathBuf, BlobError> {
        let trimmed = stored_path.trim();
        if trimmed.is_empty() {
            return Err(BlobError::InvalidPath("path cannot be empty".into()));
        }
        if trimmed.contains('\0') {
            return Err(BlobError::InvalidPath(
                "path must not contain null bytes".into(),
            ));
        }

        let mut resolved = self.root.clone();
        for component in Path::new(trimmed).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir => {
                    return Err(BlobError::InvalidPath(format!(
                        "'..' traversal is not allowed: {trimmed}"
                    )));
                }
                Component::Prefix(_) => {
                    return Err(BlobError::InvalidPath(format!(
                        "drive prefixes are not allowed: {trimmed}"
                    )));
                }
            }
        }

        if resolved == self.root {
            return Err(BlobError::InvalidPath(format!(
                "path does not name a file: {trimmed}"
            )));
        }

        Ok(resolved)
    }
}

#[async_trait]
impl BlobSource for FilesystemSource {
    async fn open(&self, path: &str) -> Result<BoxReader, BlobError> {
        let fs_path = self.resolve(path)?;
        match fs::metadata(&fs_path).await {
            Ok(meta) if !meta.is_file() => {
                return Err(BlobError::InvalidPath(format!(
                    "not a regular file: {path}"
                )));
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BlobError::NotFound(path.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        match fs::File::open(&fs_path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn size(&self, path: &str) -> Result<u64, BlobError> {
        let fs_path = self.resolve(path)?;
        match fs::metadata(&fs_path).await {
            Ok(meta) if meta.is_file() => Ok(meta.len()),
            Ok(_) => Err(BlobError::InvalidPath(format!(
                "not a regular file: {path}"
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
