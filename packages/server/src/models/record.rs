use chrono::{DateTime, Utc};
use common::integrity::IntegrityRecord;
use common::{ChecksumKind, IntegrityStatus, LocationKind, VerificationMethod};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::shared::Pagination;

/// Register a file before its bytes are transferred.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRecordRequest {
    /// Archive entry the file belongs to.
    #[schema(example = 42)]
    pub owner_id: i32,
    #[schema(example = "/archive/2024/photos.tar")]
    pub stored_path: String,
    #[schema(example = "photos.tar")]
    pub original_name: String,
    pub location_kind: LocationKind,
    pub notes: Option<String>,
}

/// Query parameters for listing integrity records.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListRecordsParams {
    /// Filter by status.
    #[param(example = "corrupted")]
    pub status: Option<String>,
    /// Filter by owning archive entry.
    pub owner_id: Option<i32>,
    /// Filter by location kind.
    #[param(example = "nas")]
    pub location_kind: Option<String>,
    /// Substring of the original name or the SHA-256 hex.
    pub search: Option<String>,
    /// Page number (1-indexed).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Items per page (1-100, default 20).
    #[param(example = 20)]
    pub per_page: Option<u64>,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct VerifyRequest {
    /// Digest to compare. Defaults to the configured kind (sha256).
    #[serde(default)]
    pub checksum_type: Option<ChecksumKind>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct VerifyBatchRequest {
    pub ids: Vec<Uuid>,
    #[serde(default)]
    pub checksum_type: Option<ChecksumKind>,
    /// Maximum verifications in flight. Defaults to the configured limit.
    #[serde(default)]
    #[schema(example = 4)]
    pub concurrency: Option<usize>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RecordResponse {
    pub id: Uuid,
    #[schema(example = 42)]
    pub owner_id: i32,
    #[schema(example = "/archive/2024/photos.tar")]
    pub stored_path: String,
    #[schema(example = "photos.tar")]
    pub original_name: String,
    #[schema(example = 1610612736)]
    pub size_bytes: u64,
    #[schema(example = "1.50 GB")]
    pub size_display: String,
    pub checksum_md5: Option<String>,
    pub checksum_sha256: Option<String>,
    pub location_kind: LocationKind,
    #[schema(example = "NAS")]
    pub location_display: String,
    pub status: IntegrityStatus,
    pub last_verified_at: Option<DateTime<Utc>>,
    pub verification_error: Option<String>,
    pub last_verification_method: Option<VerificationMethod>,
    #[schema(example = "application/x-tar")]
    pub mime_type: Option<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<IntegrityRecord> for RecordResponse {
    fn from(r: IntegrityRecord) -> Self {
        Self {
            size_display: r.size_display(),
            location_display: r.location_kind.display_name().to_string(),
            checksum_md5: r.checksums.map(|c| c.md5.to_hex()),
            checksum_sha256: r.checksums.map(|c| c.sha256.to_hex()),
            id: r.id,
            owner_id: r.owner_id,
            stored_path: r.stored_path,
            original_name: r.original_name,
            size_bytes: r.size_bytes,
            location_kind: r.location_kind,
            status: r.status,
            last_verified_at: r.last_verified_at,
            verification_error: r.verification_error,
            last_verification_method: r.last_verification_method,
            mime_type: r.mime_type,
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RecordListResponse {
    pub data: Vec<RecordResponse>,
    pub pagination: Pagination,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct StatusCount {
    pub status: IntegrityStatus,
    #[schema(example = 12)]
    pub count: u64,
}

/// Record counts, one entry per status including empty ones.
#[derive(Serialize, utoipa::ToSchema)]
pub struct StatsResponse {
    #[schema(example = 120)]
    pub total: u64,
    pub by_status: Vec<StatusCount>,
}

impl From<Vec<(IntegrityStatus, u64)>> for StatsResponse {
    fn from(counts: Vec<(IntegrityStatus, u64)>) -> Self {
        Self {
            total: counts.iter().map(|(_, n)| n).sum(),
            by_status: counts
                .into_iter()
                .map(|(status, count)| StatusCount { status, count })
                .collect(),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DeleteRecordsResponse {
    #[schema(example = 3)]
    pub deleted: u64,
}
