use std::fmt;

use crate::status::LocationKind;

/// Errors that can occur while reading from a blob source.
#[derive(Debug)]
pub enum BlobError {
    /// Nothing exists at the requested path.
    NotFound(String),
    /// An I/O error occurred.
    Io(std::io::Error),
    /// The stored path cannot be mapped into the source (traversal, not a file).
    InvalidPath(String),
    /// No adapter is configured for this location kind.
    Unsupported(LocationKind),
    /// The remote backend rejected or failed the request.
    Backend(String),
}

impl BlobError {
    /// True when the source answered that the blob does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl fmt::Display for BlobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "blob not found: {path}"),
            Self::Io(err) => write!(f, "storage IO error: {err}"),
            Self::InvalidPath(msg) => write!(f, "invalid stored path: {msg}"),
            Self::Unsupported(kind) => {
                write!(f, "no blob source configured for location '{kind}'")
            }
            Self::Backend(msg) => write!(f, "storage backend error: {msg}"),
        }
    }
}

impl std::error::Error for BlobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BlobError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
