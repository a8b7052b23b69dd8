mod calculator;
mod digest;

pub use calculator::{
    ChecksumCalculator, ChecksumError, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_UPLOAD_BYTES, Fingerprint,
};
pub use digest::{HexDigest, InvalidDigest, Md5Digest, Sha256Digest};
