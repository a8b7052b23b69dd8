use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::record::{IntegrityRecord, RecordId};
use super::store::{RecordFilter, RecordOrder, RecordStore, StoreError};
use crate::status::IntegrityStatus;

/// In-process record store for tests and embedded hosts.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<RecordId, IntegrityRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn filtered(
        records: &HashMap<RecordId, IntegrityRecord>,
        filter: &RecordFilter,
    ) -> Vec<IntegrityRecord> {
        let mut matched: Vec<_> = records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        // UUIDv7 ids break ties between records created in the same instant.
        match filter.order {
            RecordOrder::NewestFirst => {
                matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
            }
            // `None < Some(_)`, so never-verified records lead.
            RecordOrder::LeastRecentlyVerified => matched.sort_by(|a, b| {
                a.last_verified_at
                    .cmp(&b.last_verified_at)
                    .then(a.created_at.cmp(&b.created_at))
                    .then(a.id.cmp(&b.id))
            }),
        }
        matched
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert(&self, record: &IntegrityRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn get(&self, id: RecordId) -> Result<Option<IntegrityRecord>, StoreError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn save(&self, record: &IntegrityRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        match records.get_mut(&record.id) {
            Some(slot) => {
                *slot = record.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(record.id)),
        }
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<IntegrityRecord>, StoreError> {
        let records = self.records.read().await;
        let offset = filter.offset.unwrap_or(0) as usize;
        let limit = filter.limit.map_or(usize::MAX, |l| l as usize);
        Ok(Self::filtered(&records, filter)
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn count(&self, filter: &RecordFilter) -> Result<u64, StoreError> {
        let records = self.records.read().await;
        Ok(records.values().filter(|r| filter.matches(r)).count() as u64)
    }

    async fn status_counts(&self) -> Result<Vec<(IntegrityStatus, u64)>, StoreError> {
        let records = self.records.read().await;
        Ok(IntegrityStatus::ALL
            .iter()
            .map(|&status| {
                let n = records.values().filter(|r| r.status == status).count();
                (status, n as u64)
            })
            .collect())
    }

    async fn delete_by_owner(&self, owner_id: i32) -> Result<u64, StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| r.owner_id != owner_id);
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::checksum::ChecksumCalculator;
    use crate::integrity::record::NewRecord;
    use crate::status::LocationKind;

    fn record(owner_id: i32, name: &str, offset_secs: i64) -> IntegrityRecord {
        IntegrityRecord::new(
            NewRecord {
                owner_id,
                stored_path: format!("/data/{name}"),
                original_name: name.into(),
                location_kind: LocationKind::Local,
                notes: None,
            },
            Utc::now() + Duration::seconds(offset_secs),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn insert_get_save() {
        let store = MemoryRecordStore::new();
        let mut r = record(1, "a.bin", 0);
        store.insert(&r).await.unwrap();
        assert!(matches!(
            store.insert(&r).await,
            Err(StoreError::Duplicate(_))
        ));

        r.apply_fingerprint(&ChecksumCalculator::calculate_bytes(b"x"), Utc::now())
            .unwrap();
        store.save(&r).await.unwrap();
        let loaded = store.get(r.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, IntegrityStatus::Stored);

        let stranger = record(1, "b.bin", 0);
        assert!(matches!(
            store.save(&stranger).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_is_newest_first_and_paged() {
        let store = MemoryRecordStore::new();
        for (i, name) in ["old.bin", "mid.bin", "new.bin"].iter().enumerate() {
            store.insert(&record(1, name, i as i64)).await.unwrap();
        }

        let all = store.list(&RecordFilter::default()).await.unwrap();
        let names: Vec<_> = all.iter().map(|r| r.original_name.as_str()).collect();
        assert_eq!(names, ["new.bin", "mid.bin", "old.bin"]);

        let page = store
            .list(&RecordFilter {
                limit: Some(1),
                offset: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page[0].original_name, "mid.bin");
        assert_eq!(store.count(&RecordFilter::default()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn status_counts_include_zeros() {
        let store = MemoryRecordStore::new();
        store.insert(&record(1, "a.bin", 0)).await.unwrap();

        let counts = store.status_counts().await.unwrap();
        assert_eq!(counts.len(), IntegrityStatus::ALL.len());
        assert_eq!(counts[0], (IntegrityStatus::Pending, 1));
        assert!(counts[1..].iter().all(|(_, n)| *n == 0));
    }

    #[tokio::test]
    async fn search_and_owner_filters() {
        let store = MemoryRecordStore::new();
        store.insert(&record(1, "photos.tar", 0)).await.unwrap();
        store.insert(&record(2, "videos.tar", 0)).await.unwrap();

        let found = store
            .list(&RecordFilter {
                search: Some("photo".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(store.count(&RecordFilter::by_owner(2)).await.unwrap(), 1);

        assert_eq!(store.delete_by_owner(1).await.unwrap(), 1);
        assert_eq!(store.len().await, 1);
    }
}
