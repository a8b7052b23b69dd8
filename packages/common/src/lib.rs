pub mod checksum;
pub mod config;
pub mod integrity;
pub mod status;
pub mod storage;

pub use status::{ChecksumKind, IntegrityStatus, LocationKind, VerificationMethod};
