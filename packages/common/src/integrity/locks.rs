use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::record::RecordId;

/// Per-record mutual exclusion for read-modify-write of a single record.
///
/// Entries are dropped once the last holder releases them.
#[derive(Clone, Default)]
pub struct RecordLocks {
    locks: Arc<DashMap<RecordId, Arc<Mutex<()>>>>,
}

pub struct RecordLockGuard {
    id: RecordId,
    locks: Arc<DashMap<RecordId, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl RecordLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, id: RecordId) -> RecordLockGuard {
        let mutex = self
            .locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        RecordLockGuard {
            id,
            locks: self.locks.clone(),
            guard: Some(guard),
        }
    }

    /// Number of records currently locked or awaited.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for RecordLockGuard {
    fn drop(&mut self) {
        // Release first so the map's Arc is the only one left when idle.
        self.guard.take();
        self.locks
            .remove_if(&self.id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn same_record_is_serialized() {
        let locks = RecordLocks::new();
        let id = Uuid::now_v7();

        let first = locks.lock(id).await;
        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.lock(id).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(first);
        contender.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn different_records_do_not_block() {
        let locks = RecordLocks::new();
        let _a = locks.lock(Uuid::now_v7()).await;
        let _b = locks.lock(Uuid::now_v7()).await;
        assert_eq!(locks.len(), 2);
    }
}
