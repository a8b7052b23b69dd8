mod error;
mod sources;
mod traits;

pub mod filesystem;
#[cfg(feature = "object-storage")]
pub mod object;

pub use error::BlobError;
pub use filesystem::FilesystemSource;
pub use sources::BlobSources;
pub use traits::{BlobSource, BoxReader};
