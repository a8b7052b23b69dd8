use async_trait::async_trait;
use common::checksum::{Md5Digest, Sha256Digest};
use common::integrity::{
    Checksums, IntegrityRecord, RecordFilter, RecordId, RecordOrder, RecordStore, StoreError,
};
use common::IntegrityStatus;
use sea_orm::sea_query::{LikeExpr, NullOrdering, Order};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set, SqlErr,
};

use crate::entity::integrity_record;
use crate::models::shared::escape_like;

/// SeaORM-backed record store over the `integrity_record` table.
#[derive(Clone)]
pub struct DbRecordStore {
    db: DatabaseConnection,
}

impl DbRecordStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn filtered(filter: &RecordFilter) -> Select<integrity_record::Entity> {
        let mut select = integrity_record::Entity::find();

        if !filter.statuses.is_empty() {
            select = select.filter(integrity_record::Column::Status.is_in(filter.statuses.clone()));
        }
        if let Some(owner_id) = filter.owner_id {
            select = select.filter(integrity_record::Column::OwnerId.eq(owner_id));
        }
        if let Some(kind) = filter.location_kind {
            select = select.filter(integrity_record::Column::LocationKind.eq(kind));
        }
        if let Some(search) = filter.search.as_deref() {
            let term = escape_like(search);
            if !term.is_empty() {
                let pattern = format!("%{term}%");
                select = select.filter(
                    Condition::any()
                        .add(
                            integrity_record::Column::OriginalName
                                .like(LikeExpr::new(pattern.clone()).escape('\\')),
                        )
                        .add(
                            integrity_record::Column::ChecksumSha256
                                .like(LikeExpr::new(pattern).escape('\\')),
                        ),
                );
            }
        }
        if let Some(cutoff) = filter.not_verified_since {
            select = select.filter(
                Condition::any()
                    .add(integrity_record::Column::LastVerifiedAt.is_null())
                    .add(integrity_record::Column::LastVerifiedAt.lt(cutoff)),
            );
        }

        select
    }
}

fn backend(err: DbErr) -> StoreError {
    tracing::error!(error = %err, "Record store query failed");
    StoreError::Backend(err.to_string())
}

fn to_active_model(record: &IntegrityRecord) -> Result<integrity_record::ActiveModel, StoreError> {
    let size_bytes = i64::try_from(record.size_bytes)
        .map_err(|_| StoreError::Backend(format!("size of {} out of range", record.id)))?;

    Ok(integrity_record::ActiveModel {
        id: Set(record.id),
        owner_id: Set(record.owner_id),
        stored_path: Set(record.stored_path.clone()),
        original_name: Set(record.original_name.clone()),
        size_bytes: Set(size_bytes),
        checksum_md5: Set(record.checksums.map(|c| c.md5.to_hex())),
        checksum_sha256: Set(record.checksums.map(|c| c.sha256.to_hex())),
        location_kind: Set(record.location_kind),
        status: Set(record.status),
        last_verified_at: Set(record.last_verified_at),
        verification_error: Set(record.verification_error.clone()),
        last_verification_method: Set(record.last_verification_method),
        mime_type: Set(record.mime_type.clone()),
        notes: Set(record.notes.clone()),
        created_at: Set(record.created_at),
        updated_at: Set(record.updated_at),
    })
}

/// Rebuild a domain record from a row, rejecting rows that break its invariants.
pub fn from_model(m: integrity_record::Model) -> Result<IntegrityRecord, StoreError> {
    let id = m.id;
    let corrupt = |reason: String| StoreError::Corrupt(format!("record {id}: {reason}"));

    let checksums = match (&m.checksum_md5, &m.checksum_sha256) {
        (Some(md5), Some(sha256)) => Some(Checksums {
            md5: Md5Digest::from_hex(md5).map_err(|e| corrupt(e.to_string()))?,
            sha256: Sha256Digest::from_hex(sha256).map_err(|e| corrupt(e.to_string()))?,
        }),
        (None, None) => None,
        _ => return Err(corrupt("only one of the two checksums is set".into())),
    };
    let size_bytes =
        u64::try_from(m.size_bytes).map_err(|_| corrupt(format!("negative size {}", m.size_bytes)))?;

    let record = IntegrityRecord {
        id,
        owner_id: m.owner_id,
        stored_path: m.stored_path,
        original_name: m.original_name,
        size_bytes,
        checksums,
        location_kind: m.location_kind,
        status: m.status,
        last_verified_at: m.last_verified_at,
        verification_error: m.verification_error,
        last_verification_method: m.last_verification_method,
        mime_type: m.mime_type,
        notes: m.notes,
        created_at: m.created_at,
        updated_at: m.updated_at,
    };
    record.validate().map_err(StoreError::Corrupt)?;
    Ok(record)
}

#[async_trait]
impl RecordStore for DbRecordStore {
    async fn insert(&self, record: &IntegrityRecord) -> Result<(), StoreError> {
        let model = to_active_model(record)?;
        match integrity_record::Entity::insert(model).exec(&self.db).await {
            Ok(_) => Ok(()),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(StoreError::Duplicate(record.id))
            }
            Err(e) => Err(backend(e)),
        }
    }

    async fn get(&self, id: RecordId) -> Result<Option<IntegrityRecord>, StoreError> {
        integrity_record::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(backend)?
            .map(from_model)
            .transpose()
    }

    async fn save(&self, record: &IntegrityRecord) -> Result<(), StoreError> {
        let model = to_active_model(record)?;
        let result = integrity_record::Entity::update_many()
            .set(model)
            .filter(integrity_record::Column::Id.eq(record.id))
            .exec(&self.db)
            .await
            .map_err(backend)?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(record.id));
        }
        Ok(())
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<IntegrityRecord>, StoreError> {
        let mut select = match filter.order {
            RecordOrder::NewestFirst => Self::filtered(filter)
                .order_by_desc(integrity_record::Column::CreatedAt)
                .order_by_desc(integrity_record::Column::Id),
            RecordOrder::LeastRecentlyVerified => Self::filtered(filter)
                .order_by_with_nulls(
                    integrity_record::Column::LastVerifiedAt,
                    Order::Asc,
                    NullOrdering::First,
                )
                .order_by_asc(integrity_record::Column::CreatedAt)
                .order_by_asc(integrity_record::Column::Id),
        };
        if let Some(offset) = filter.offset {
            select = select.offset(offset);
        }
        if let Some(limit) = filter.limit {
            select = select.limit(limit);
        }

        select
            .all(&self.db)
            .await
            .map_err(backend)?
            .into_iter()
            .map(from_model)
            .collect()
    }

    async fn count(&self, filter: &RecordFilter) -> Result<u64, StoreError> {
        Self::filtered(filter).count(&self.db).await.map_err(backend)
    }

    async fn status_counts(&self) -> Result<Vec<(IntegrityStatus, u64)>, StoreError> {
        let mut counts = Vec::with_capacity(IntegrityStatus::ALL.len());
        for &status in IntegrityStatus::ALL {
            let n = integrity_record::Entity::find()
                .filter(integrity_record::Column::Status.eq(status))
                .count(&self.db)
                .await
                .map_err(backend)?;
            counts.push((status, n));
        }
        Ok(counts)
    }

    async fn delete_by_owner(&self, owner_id: i32) -> Result<u64, StoreError> {
        let result = integrity_record::Entity::delete_many()
            .filter(integrity_record::Column::OwnerId.eq(owner_id))
            .exec(&self.db)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected)
    }
}
