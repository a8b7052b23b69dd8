use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a hex digest string fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {algorithm} digest: {reason}")]
pub struct InvalidDigest {
    algorithm: &'static str,
    reason: String,
}

/// A fixed-size cryptographic digest, rendered as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HexDigest<const N: usize>([u8; N]);

/// 16-byte MD5 digest (32 hex characters).
pub type Md5Digest = HexDigest<16>;

/// 32-byte SHA-256 digest (64 hex characters).
pub type Sha256Digest = HexDigest<32>;

impl<const N: usize> HexDigest<N> {
    fn algorithm() -> &'static str {
        match N {
            16 => "MD5",
            32 => "SHA-256",
            _ => "digest",
        }
    }

    /// Construct from raw digest bytes.
    pub fn from_bytes(bytes: [u8; N]) -> Self {
        Self(bytes)
    }

    /// Parse a hex-encoded digest string. Uppercase input is accepted.
    pub fn from_hex(s: &str) -> Result<Self, InvalidDigest> {
        if s.len() != N * 2 {
            return Err(InvalidDigest {
                algorithm: Self::algorithm(),
                reason: format!("expected {} hex characters, got {}", N * 2, s.len()),
            });
        }

        let bytes = hex::decode(s).map_err(|e| InvalidDigest {
            algorithm: Self::algorithm(),
            reason: format!("invalid hex: {e}"),
        })?;

        let arr: [u8; N] = bytes.try_into().map_err(|_| InvalidDigest {
            algorithm: Self::algorithm(),
            reason: "decoded to wrong length".into(),
        })?;

        Ok(Self(arr))
    }

    /// Return the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl<const N: usize> fmt::Debug for HexDigest<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", Self::algorithm(), self.to_hex())
    }
}

impl<const N: usize> fmt::Display for HexDigest<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl<const N: usize> FromStr for HexDigest<N> {
    type Err = InvalidDigest;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl<const N: usize> Serialize for HexDigest<N> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de, const N: usize> Deserialize<'de> for HexDigest<N> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
