use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use common::integrity::{
    BatchReport, ByteSource, NewRecord, RecordFilter, VerificationResult,
};
use common::{IntegrityStatus, LocationKind};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::record::*;
use crate::models::shared::Pagination;
use crate::state::AppState;

/// Upper bound on ids accepted by one batch request.
pub const MAX_BATCH_IDS: usize = 1000;

/// Register an integrity record.
#[utoipa::path(
    post,
    path = "/",
    tag = "Integrity Records",
    operation_id = "registerRecord",
    summary = "Register a file",
    description = "Creates a `pending` record for a file that is about to be stored. No bytes are read.",
    request_body = RegisterRecordRequest,
    responses(
        (status = 201, description = "Record created", body = RecordResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(owner_id = payload.owner_id))]
pub async fn register_record(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRecordRequest>,
) -> Result<(StatusCode, Json<RecordResponse>), AppError> {
    let record = state
        .integrity
        .register_record(
            NewRecord {
                owner_id: payload.owner_id,
                stored_path: payload.stored_path,
                original_name: payload.original_name,
                location_kind: payload.location_kind,
                notes: payload.notes,
            },
            Utc::now(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// List integrity records.
#[utoipa::path(
    get,
    path = "/",
    tag = "Integrity Records",
    operation_id = "listRecords",
    summary = "List integrity records",
    description = "Returns a paginated list of records, newest first. Supports filtering by status, owner and location, and searching by original name or SHA-256.",
    params(ListRecordsParams),
    responses(
        (status = 200, description = "List of records", body = RecordListResponse),
        (status = 400, description = "Invalid filter value (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_records(
    State(state): State<AppState>,
    Query(params): Query<ListRecordsParams>,
) -> Result<Json<RecordListResponse>, AppError> {
    let status = params
        .status
        .as_deref()
        .map(str::parse::<IntegrityStatus>)
        .transpose()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let location_kind = params
        .location_kind
        .as_deref()
        .map(str::parse::<LocationKind>)
        .transpose()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1)
        .checked_mul(per_page)
        .filter(|offset| i64::try_from(*offset).is_ok())
        .ok_or_else(|| AppError::Validation(format!("Page {page} is out of range")))?;

    let filter = RecordFilter {
        statuses: status.into_iter().collect(),
        owner_id: params.owner_id,
        location_kind,
        search: params
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        limit: Some(per_page),
        offset: Some(offset),
        ..Default::default()
    };

    let store = state.integrity.store();
    let total = store.count(&filter).await?;
    let records = store.list(&filter).await?;

    Ok(Json(RecordListResponse {
        data: records.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(page, per_page, total),
    }))
}

/// Get record counts by status.
#[utoipa::path(
    get,
    path = "/stats",
    tag = "Integrity Records",
    operation_id = "getRecordStats",
    summary = "Get status breakdown",
    responses(
        (status = 200, description = "Counts per status", body = StatsResponse),
    ),
)]
#[instrument(skip(state))]
pub async fn record_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let counts = state.integrity.store().status_counts().await?;
    Ok(Json(counts.into()))
}

/// Get a single integrity record.
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Integrity Records",
    operation_id = "getRecord",
    summary = "Get record details",
    params(("id" = Uuid, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Record details", body = RecordResponse),
        (status = 404, description = "Record not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id = %id))]
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RecordResponse>, AppError> {
    let record = state.integrity.get(id).await?;
    Ok(Json(record.into()))
}

/// Calculate checksums from the stored blob.
#[utoipa::path(
    post,
    path = "/{id}/checksum",
    tag = "Integrity Records",
    operation_id = "calculateRecordChecksum",
    summary = "Calculate checksums",
    description = "Streams the blob at the record's stored path once, records its MD5 and SHA-256, and moves the record to `stored`. The record is unchanged on failure.",
    params(("id" = Uuid, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Checksums recorded", body = RecordResponse),
        (status = 404, description = "Record not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Status does not allow recalculation (CONFLICT)", body = ErrorBody),
        (status = 422, description = "Blob could not be read (SOURCE_UNREADABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id = %id))]
pub async fn calculate_checksum(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RecordResponse>, AppError> {
    let record = state
        .integrity
        .calculate_checksum(id, ByteSource::Stored, Utc::now())
        .await?;
    Ok(Json(record.into()))
}

/// Verify a record against its blob.
#[utoipa::path(
    post,
    path = "/{id}/verify",
    tag = "Integrity Records",
    operation_id = "verifyRecord",
    summary = "Verify integrity",
    description = "Recomputes the selected digest from the live blob. A mismatch or an unreadable blob is reported as the `corrupted` or `missing` outcome, not as an error.",
    params(("id" = Uuid, Path, description = "Record ID")),
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Verification outcome", body = VerificationResult),
        (status = 404, description = "Record not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "No recorded checksums (CHECKSUM_NOT_COMPUTED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(id = %id))]
pub async fn verify_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<VerifyRequest>,
) -> Result<Json<VerificationResult>, AppError> {
    let options = state
        .integrity
        .verify_options(payload.checksum_type, Utc::now());
    let result = state.integrity.verify_one(id, &options).await?;
    Ok(Json(result))
}

/// Mark a record verified without reading it.
#[utoipa::path(
    post,
    path = "/{id}/mark-verified",
    tag = "Integrity Records",
    operation_id = "markRecordVerified",
    summary = "Mark verified without a check",
    description = "Operator override. Requires recorded checksums. The verification method is recorded as `asserted`.",
    params(("id" = Uuid, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Record marked verified", body = RecordResponse),
        (status = 404, description = "Record not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "No recorded checksums (CHECKSUM_NOT_COMPUTED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id = %id))]
pub async fn mark_verified(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RecordResponse>, AppError> {
    let record = state
        .integrity
        .mark_verified_without_check(id, Utc::now())
        .await?;
    Ok(Json(record.into()))
}

/// Verify many records.
#[utoipa::path(
    post,
    path = "/verify-batch",
    tag = "Integrity Records",
    operation_id = "verifyRecordBatch",
    summary = "Verify a batch of records",
    description = "Verifies every listed record through a bounded worker pool and returns a report. Per-record failures are counted in the report; the request fails only when the id list is empty, too long, or names an unknown record.",
    request_body = VerifyBatchRequest,
    responses(
        (status = 200, description = "Batch report", body = BatchReport),
        (status = 400, description = "Empty or oversized id list (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Unknown record (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(records = payload.ids.len()))]
pub async fn verify_batch(
    State(state): State<AppState>,
    AppJson(payload): AppJson<VerifyBatchRequest>,
) -> Result<Json<BatchReport>, AppError> {
    if payload.ids.len() > MAX_BATCH_IDS {
        return Err(AppError::Validation(format!(
            "At most {MAX_BATCH_IDS} records can be verified per request"
        )));
    }

    let options =
        state
            .integrity
            .batch_options(payload.checksum_type, payload.concurrency, Utc::now());
    let report = state
        .integrity
        .verify_batch(&payload.ids, &options, &state.shutdown)
        .await?;
    Ok(Json(report))
}

/// Remove every record of an archive entry.
#[utoipa::path(
    delete,
    path = "/{owner_id}/records",
    tag = "Integrity Records",
    operation_id = "deleteOwnerRecords",
    summary = "Delete an owner's records",
    description = "Called when an archive entry is deleted. Blob bytes are not touched.",
    params(("owner_id" = i32, Path, description = "Archive entry ID")),
    responses(
        (status = 200, description = "Records removed", body = DeleteRecordsResponse),
    ),
)]
#[instrument(skip(state))]
pub async fn delete_owner_records(
    State(state): State<AppState>,
    Path(owner_id): Path<i32>,
) -> Result<Json<DeleteRecordsResponse>, AppError> {
    let deleted = state
        .integrity
        .store()
        .delete_by_owner(owner_id)
        .await?;
    info!(owner_id, deleted, "Owner records deleted");
    Ok(Json(DeleteRecordsResponse { deleted }))
}
