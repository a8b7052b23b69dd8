use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::IntegrityError;
use crate::checksum::{Fingerprint, Md5Digest, Sha256Digest};
use crate::status::{ChecksumKind, IntegrityStatus, LocationKind, VerificationMethod};

/// Integrity record identifier (UUIDv7).
pub type RecordId = Uuid;

const MAX_PATH_LEN: usize = 1024;
const MAX_NAME_LEN: usize = 255;

/// The two recorded fingerprints. Always present or absent together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksums {
    pub md5: Md5Digest,
    pub sha256: Sha256Digest,
}

impl Checksums {
    pub fn hex(&self, kind: ChecksumKind) -> String {
        match kind {
            ChecksumKind::Md5 => self.md5.to_hex(),
            ChecksumKind::Sha256 => self.sha256.to_hex(),
        }
    }

    pub fn matches(&self, computed: &Fingerprint, kind: ChecksumKind) -> bool {
        match kind {
            ChecksumKind::Md5 => self.md5 == computed.md5,
            ChecksumKind::Sha256 => self.sha256 == computed.sha256,
        }
    }
}

impl From<&Fingerprint> for Checksums {
    fn from(fp: &Fingerprint) -> Self {
        Self {
            md5: fp.md5,
            sha256: fp.sha256,
        }
    }
}

/// Input for registering a file before its bytes are transferred.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub owner_id: i32,
    pub stored_path: String,
    pub original_name: String,
    pub location_kind: LocationKind,
    pub notes: Option<String>,
}

/// A persisted record of a file's location, known-good fingerprints, and
/// verification history.
///
/// Mutate through the transition methods; they keep `status`,
/// `verification_error`, `last_verified_at` and the recorded method in step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityRecord {
    pub id: RecordId,
    /// Weak reference to the archive entry this file belongs to.
    pub owner_id: i32,
    pub stored_path: String,
    pub original_name: String,
    pub size_bytes: u64,
    pub checksums: Option<Checksums>,
    pub location_kind: LocationKind,
    pub status: IntegrityStatus,
    pub last_verified_at: Option<DateTime<Utc>>,
    pub verification_error: Option<String>,
    pub last_verification_method: Option<VerificationMethod>,
    pub mime_type: Option<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IntegrityRecord {
    /// Create a `pending` record.
    pub fn new(input: NewRecord, now: DateTime<Utc>) -> Result<Self, IntegrityError> {
        let stored_path = validate_stored_path(&input.stored_path)?;
        let original_name = validate_original_name(&input.original_name)?;
        let mime_type = mime_guess::from_path(&original_name)
            .first()
            .map(|m| m.to_string());

        Ok(Self {
            id: Uuid::now_v7(),
            owner_id: input.owner_id,
            stored_path,
            original_name,
            size_bytes: 0,
            checksums: None,
            location_kind: input.location_kind,
            status: IntegrityStatus::Pending,
            last_verified_at: None,
            verification_error: None,
            last_verification_method: None,
            mime_type,
            notes: input.notes.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
    }

    fn transition(&mut self, next: IntegrityStatus) -> Result<(), IntegrityError> {
        if !self.status.can_transition_to(next) {
            return Err(IntegrityError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    fn require_checksums(&self) -> Result<Checksums, IntegrityError> {
        self.checksums
            .ok_or(IntegrityError::ChecksumNotComputed(self.id))
    }

    /// The external upload path has started transferring bytes.
    ///
    /// Allowed from `pending`, and from `missing` when the record was checked
    /// before its bytes ever arrived.
    pub fn begin_upload(&mut self, now: DateTime<Utc>) -> Result<(), IntegrityError> {
        if self.status == IntegrityStatus::Missing && self.checksums.is_some() {
            return Err(IntegrityError::InvalidTransition {
                from: self.status,
                to: IntegrityStatus::Uploading,
            });
        }
        self.transition(IntegrityStatus::Uploading)?;
        self.updated_at = now;
        Ok(())
    }

    /// Record freshly computed fingerprints and move to `stored`.
    ///
    /// `last_verified_at` is left alone: computing is not verifying.
    pub fn apply_fingerprint(
        &mut self,
        fingerprint: &Fingerprint,
        now: DateTime<Utc>,
    ) -> Result<(), IntegrityError> {
        self.transition(IntegrityStatus::Stored)?;
        self.checksums = Some(Checksums::from(fingerprint));
        self.size_bytes = fingerprint.total_bytes;
        self.verification_error = None;
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_verified(
        &mut self,
        at: DateTime<Utc>,
        method: VerificationMethod,
    ) -> Result<(), IntegrityError> {
        self.require_checksums()?;
        self.transition(IntegrityStatus::Verified)?;
        self.verification_error = None;
        self.last_verified_at = Some(at);
        self.last_verification_method = Some(method);
        self.updated_at = at;
        Ok(())
    }

    pub fn mark_corrupted(
        &mut self,
        at: DateTime<Utc>,
        kind: ChecksumKind,
        error: String,
    ) -> Result<(), IntegrityError> {
        self.require_checksums()?;
        self.transition(IntegrityStatus::Corrupted)?;
        self.verification_error = Some(error);
        self.last_verified_at = Some(at);
        self.last_verification_method = Some(kind.into());
        self.updated_at = at;
        Ok(())
    }

    /// The blob could not be read. Recorded checksums describe the last
    /// known-good content and stay untouched.
    pub fn mark_missing(
        &mut self,
        at: DateTime<Utc>,
        kind: ChecksumKind,
        error: String,
    ) -> Result<(), IntegrityError> {
        self.transition(IntegrityStatus::Missing)?;
        self.verification_error = Some(error);
        self.last_verified_at = Some(at);
        self.last_verification_method = Some(kind.into());
        self.updated_at = at;
        Ok(())
    }

    /// Check the cross-field invariants. Used when loading persisted rows.
    pub fn validate(&self) -> Result<(), String> {
        match self.status {
            IntegrityStatus::Verified | IntegrityStatus::Corrupted => {
                if self.checksums.is_none() {
                    return Err(format!("{} record {} has no checksums", self.status, self.id));
                }
                if self.last_verified_at.is_none() {
                    return Err(format!(
                        "{} record {} was never verified",
                        self.status, self.id
                    ));
                }
            }
            IntegrityStatus::Missing if self.last_verified_at.is_none() => {
                return Err(format!("missing record {} was never verified", self.id));
            }
            IntegrityStatus::Stored if self.checksums.is_none() => {
                return Err(format!("stored record {} has no checksums", self.id));
            }
            _ => {}
        }

        if self.status == IntegrityStatus::Verified && self.verification_error.is_some() {
            return Err(format!("verified record {} carries an error", self.id));
        }

        Ok(())
    }

    /// Human-readable size, e.g. "1.50 GB".
    pub fn size_display(&self) -> String {
        format_size(self.size_bytes)
    }
}

/// Format a byte count using binary units.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

fn validate_stored_path(path: &str) -> Result<String, IntegrityError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(IntegrityError::Validation("Stored path cannot be empty".into()));
    }
    if trimmed.len() > MAX_PATH_LEN {
        return Err(IntegrityError::Validation(format!(
            "Stored path exceeds maximum length of {MAX_PATH_LEN} characters"
        )));
    }
    if trimmed.chars().any(|c| c.is_ascii_control()) {
        return Err(IntegrityError::Validation(
            "Stored path must not contain control characters".into(),
        ));
    }
    Ok(trimmed.to_string())
}

fn validate_original_name(name: &str) -> Result<String, IntegrityError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(IntegrityError::Validation("Original name cannot be empty".into()));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(IntegrityError::Validation(format!(
            "Original name exceeds maximum length of {MAX_NAME_LEN} characters"
        )));
    }
    // Ends up in Content-Disposition headers downstream.
    if trimmed.chars().any(|c| c.is_ascii_control()) {
        return Err(IntegrityError::Validation(
            "Original name must not contain control characters".into(),
        ));
    }
    Ok(trimmed.to_string())
}
