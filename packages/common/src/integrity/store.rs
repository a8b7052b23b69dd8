use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::record::{IntegrityRecord, RecordId};
use crate::status::{IntegrityStatus, LocationKind};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(RecordId),

    #[error("Record already exists: {0}")]
    Duplicate(RecordId),

    /// A persisted row cannot be turned back into a valid record.
    #[error("Corrupt record row: {0}")]
    Corrupt(String),

    #[error("{0}")]
    Backend(String),
}

/// Result ordering for [`RecordStore::list`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordOrder {
    /// Most recently created first.
    #[default]
    NewestFirst,
    /// Never-verified records first, then oldest `last_verified_at`.
    LeastRecentlyVerified,
}

/// Selection criteria for record queries. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub statuses: Vec<IntegrityStatus>,
    pub owner_id: Option<i32>,
    pub location_kind: Option<LocationKind>,
    /// Substring of the original name, or of the SHA-256 hex.
    pub search: Option<String>,
    /// Only records never verified, or last verified before this instant.
    pub not_verified_since: Option<DateTime<Utc>>,
    pub order: RecordOrder,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl RecordFilter {
    pub fn by_status(status: IntegrityStatus) -> Self {
        Self {
            statuses: vec![status],
            ..Default::default()
        }
    }

    pub fn by_owner(owner_id: i32) -> Self {
        Self {
            owner_id: Some(owner_id),
            ..Default::default()
        }
    }

    /// Whether `record` satisfies every criterion (paging excluded).
    pub fn matches(&self, record: &IntegrityRecord) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&record.status) {
            return false;
        }
        if self.owner_id.is_some_and(|owner| owner != record.owner_id) {
            return false;
        }
        if self
            .location_kind
            .is_some_and(|kind| kind != record.location_kind)
        {
            return false;
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let in_name = record.original_name.contains(search);
            let in_sha = record
                .checksums
                .is_some_and(|c| c.sha256.to_hex().contains(search));
            if !in_name && !in_sha {
                return false;
            }
        }
        if let Some(cutoff) = self.not_verified_since
            && record.last_verified_at.is_some_and(|at| at >= cutoff)
        {
            return false;
        }
        true
    }
}

/// Persistence contract for integrity records.
///
/// `save` replaces the whole record in one write so a reader never sees
/// status and verification fields from different attempts.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, record: &IntegrityRecord) -> Result<(), StoreError>;

    async fn get(&self, id: RecordId) -> Result<Option<IntegrityRecord>, StoreError>;

    /// Fails with `NotFound` when the record does not exist.
    async fn save(&self, record: &IntegrityRecord) -> Result<(), StoreError>;

    /// Newest first.
    async fn list(&self, filter: &RecordFilter) -> Result<Vec<IntegrityRecord>, StoreError>;

    /// Ignores the paging window.
    async fn count(&self, filter: &RecordFilter) -> Result<u64, StoreError>;

    /// Count for every status, in `IntegrityStatus::ALL` order, zeros included.
    async fn status_counts(&self) -> Result<Vec<(IntegrityStatus, u64)>, StoreError>;

    /// Remove every record of an owning item. Returns the number removed.
    async fn delete_by_owner(&self, owner_id: i32) -> Result<u64, StoreError>;
}
