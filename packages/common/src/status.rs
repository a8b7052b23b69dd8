#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of an integrity record.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityStatus {
    /// Registered by its owning item, no bytes transferred yet.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "pending"))]
    Pending,
    /// Transfer in progress, no checksum yet.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "uploading"))]
    Uploading,
    /// Checksums computed at ingestion, never verified against live content.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "stored"))]
    Stored,
    /// Most recent verification matched the recorded fingerprint.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "verified"))]
    Verified,
    /// Most recent verification did not match the recorded fingerprint.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "corrupted"))]
    Corrupted,
    /// Most recent verification could not read the blob.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "missing"))]
    Missing,
}

impl IntegrityStatus {
    /// All possible status values.
    pub const ALL: &'static [IntegrityStatus] = &[
        Self::Pending,
        Self::Uploading,
        Self::Stored,
        Self::Verified,
        Self::Corrupted,
        Self::Missing,
    ];

    /// Statuses whose records carry a recorded fingerprint, or have had a
    /// verification attempt, and are therefore eligible for a sweep.
    pub const SWEEPABLE: &'static [IntegrityStatus] = &[
        Self::Stored,
        Self::Verified,
        Self::Corrupted,
        Self::Missing,
    ];

    /// Returns the string representation (snake_case).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploading => "uploading",
            Self::Stored => "stored",
            Self::Verified => "verified",
            Self::Corrupted => "corrupted",
            Self::Missing => "missing",
        }
    }

    /// Whether the state machine allows moving from `self` to `next`.
    ///
    /// Verification may run from any state (an absent blob is `missing` no
    /// matter what was recorded before), and a fresh checksum calculation
    /// re-baselines any record to `stored`. There is no terminal state.
    /// `missing -> uploading` is only meaningful for a record that never got
    /// a fingerprint; `IntegrityRecord::begin_upload` enforces that.
    pub fn can_transition_to(&self, next: IntegrityStatus) -> bool {
        use IntegrityStatus::*;
        match (self, next) {
            (Pending, Uploading | Stored | Missing) => true,
            (Uploading, Pending | Uploading | Stored | Missing) => true,
            (Stored | Verified | Corrupted | Missing, Stored | Verified | Corrupted | Missing) => {
                true
            }
            (Missing, Uploading) => true,
            _ => false,
        }
    }
}

impl fmt::Display for IntegrityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for IntegrityStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Error when parsing an invalid enum string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    kind: &'static str,
    invalid: String,
    valid: Vec<&'static str>,
}

impl ParseEnumError {
    fn new(kind: &'static str, invalid: &str, valid: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            kind,
            invalid: invalid.to_string(),
            valid: valid.into_iter().collect(),
        }
    }
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid {} '{}'. Valid values: {}",
            self.kind,
            self.invalid,
            self.valid.join(", ")
        )
    }
}

impl std::error::Error for ParseEnumError {}

impl FromStr for IntegrityStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                ParseEnumError::new("status", s, Self::ALL.iter().map(|v| v.as_str()))
            })
    }
}

/// Where a record's bytes physically live. Selects the blob source adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "local"))]
    Local,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "nas"))]
    Nas,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "s3"))]
    S3,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "glacier"))]
    Glacier,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "gcs"))]
    Gcs,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "azure"))]
    Azure,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "backblaze"))]
    Backblaze,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "other"))]
    Other,
}

impl LocationKind {
    pub const ALL: &'static [LocationKind] = &[
        Self::Local,
        Self::Nas,
        Self::S3,
        Self::Glacier,
        Self::Gcs,
        Self::Azure,
        Self::Backblaze,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Nas => "nas",
            Self::S3 => "s3",
            Self::Glacier => "glacier",
            Self::Gcs => "gcs",
            Self::Azure => "azure",
            Self::Backblaze => "backblaze",
            Self::Other => "other",
        }
    }

    /// Human-readable label, as shown in listings.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Local => "Local Disk",
            Self::Nas => "NAS",
            Self::S3 => "Amazon S3",
            Self::Glacier => "Amazon Glacier",
            Self::Gcs => "Google Cloud Storage",
            Self::Azure => "Azure Blob Storage",
            Self::Backblaze => "Backblaze B2",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                ParseEnumError::new("location kind", s, Self::ALL.iter().map(|v| v.as_str()))
            })
    }
}

/// Which digest a verification compares against.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumKind {
    Md5,
    #[default]
    Sha256,
}

impl ChecksumKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "md5" => Ok(Self::Md5),
            "sha256" => Ok(Self::Sha256),
            _ => Err(ParseEnumError::new("checksum kind", s, ["md5", "sha256"])),
        }
    }
}

/// How the most recent `verified`/`corrupted`/`missing` status was reached.
///
/// `Asserted` marks an operator override that recomputed nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "md5"))]
    Md5,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "sha256"))]
    Sha256,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "asserted"))]
    Asserted,
}

impl VerificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
            Self::Asserted => "asserted",
        }
    }

    /// True when the status was proven by recomputing a digest.
    pub fn is_computed(&self) -> bool {
        !matches!(self, Self::Asserted)
    }
}

impl From<ChecksumKind> for VerificationMethod {
    fn from(kind: ChecksumKind) -> Self {
        match kind {
            ChecksumKind::Md5 => Self::Md5,
            ChecksumKind::Sha256 => Self::Sha256,
        }
    }
}

impl fmt::Display for VerificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in IntegrityStatus::ALL {
            assert_eq!(status.as_str().parse::<IntegrityStatus>().unwrap(), *status);
        }
    }

    #[test]
    fn status_parse_error_lists_valid_values() {
        let err = "lost".parse::<IntegrityStatus>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'lost'"));
        assert!(msg.contains("corrupted"));
    }

    #[test]
    fn status_serde_uses_snake_case() {
        let json = serde_json::to_string(&IntegrityStatus::Corrupted).unwrap();
        assert_eq!(json, "\"corrupted\"");
        let parsed: LocationKind = serde_json::from_str("\"backblaze\"").unwrap();
        assert_eq!(parsed, LocationKind::Backblaze);
    }

    #[test]
    fn verification_outcomes_loop_between_each_other() {
        use IntegrityStatus::*;
        for from in [Verified, Corrupted, Missing] {
            for to in [Verified, Corrupted, Missing] {
                assert!(from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn unfingerprinted_states_cannot_be_verified() {
        use IntegrityStatus::*;
        assert!(!Pending.can_transition_to(Verified));
        assert!(!Uploading.can_transition_to(Corrupted));
        assert!(Pending.can_transition_to(Missing));
        assert!(Uploading.can_transition_to(Stored));
        assert!(Missing.can_transition_to(Uploading));
        assert!(!Stored.can_transition_to(Uploading));
        assert!(!Stored.can_transition_to(Pending));
    }

    #[test]
    fn checksum_kind_defaults_to_sha256() {
        assert_eq!(ChecksumKind::default(), ChecksumKind::Sha256);
        assert_eq!("md5".parse::<ChecksumKind>().unwrap(), ChecksumKind::Md5);
        assert!("crc32".parse::<ChecksumKind>().is_err());
    }

    #[test]
    fn asserted_method_is_not_computed() {
        assert!(!VerificationMethod::Asserted.is_computed());
        assert!(VerificationMethod::from(ChecksumKind::Md5).is_computed());
    }
}
