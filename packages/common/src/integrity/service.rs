use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::error::IntegrityError;
use super::locks::RecordLocks;
use super::record::{IntegrityRecord, NewRecord, RecordId};
use super::report::{BatchReport, VerificationOutcome, VerificationResult};
use super::store::{RecordFilter, RecordStore};
use crate::checksum::{ChecksumCalculator, ChecksumError, Fingerprint};
use crate::config::IntegrityConfig;
use crate::status::{ChecksumKind, IntegrityStatus, VerificationMethod};
use crate::storage::{BlobSources, BoxReader};

/// Where `calculate_checksum` reads bytes from.
pub enum ByteSource {
    /// The record's blob at its stored path.
    Stored,
    /// An in-flight upload. Subject to the upload size ceiling.
    Upload {
        reader: BoxReader,
        declared_size: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct VerifyOptions {
    pub checksum_kind: ChecksumKind,
    /// Timestamp recorded as `last_verified_at`.
    pub now: DateTime<Utc>,
    /// Bound on opening plus reading one blob. Exceeding it counts as missing.
    pub read_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub verify: VerifyOptions,
    /// Maximum verifications in flight. Values below 1 are treated as 1.
    pub concurrency: usize,
}

/// Batch tasks that keep running if the batch future is dropped mid-flight,
/// e.g. when the requesting client disconnects.
struct DetachOnDrop<T: 'static>(JoinSet<T>);

impl<T: 'static> Drop for DetachOnDrop<T> {
    fn drop(&mut self) {
        self.0.detach_all();
    }
}

/// A fingerprint read attempt that did not produce a digest.
enum ReadFailure {
    Source(String),
    Checksum(ChecksumError),
}

impl ReadFailure {
    fn detail(&self) -> String {
        match self {
            Self::Source(detail) => detail.clone(),
            Self::Checksum(err) => err.to_string(),
        }
    }
}

impl From<ReadFailure> for IntegrityError {
    fn from(failure: ReadFailure) -> Self {
        match failure {
            ReadFailure::Source(detail) => IntegrityError::UnreadableSource(detail),
            ReadFailure::Checksum(err) => err.into(),
        }
    }
}

/// Orchestrates checksum calculation and verification of integrity records.
///
/// Bytes are streamed without holding any lock; the record is then reloaded
/// under its per-record lock so the comparison and the state change happen
/// against the latest persisted row.
#[derive(Clone)]
pub struct VerificationService {
    store: Arc<dyn RecordStore>,
    sources: Arc<BlobSources>,
    calculator: ChecksumCalculator,
    max_upload_bytes: u64,
    default_checksum: ChecksumKind,
    read_timeout: Option<Duration>,
    concurrency: usize,
    locks: RecordLocks,
}

impl VerificationService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        sources: Arc<BlobSources>,
        config: &IntegrityConfig,
    ) -> Self {
        Self {
            store,
            sources,
            calculator: ChecksumCalculator::new(config.chunk_size),
            max_upload_bytes: config.max_upload_bytes,
            default_checksum: config.default_checksum,
            read_timeout: config.read_timeout(),
            concurrency: config.verify_concurrency.max(1),
            locks: RecordLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Options built from configuration, overridable per call.
    pub fn verify_options(&self, kind: Option<ChecksumKind>, now: DateTime<Utc>) -> VerifyOptions {
        VerifyOptions {
            checksum_kind: kind.unwrap_or(self.default_checksum),
            now,
            read_timeout: self.read_timeout,
        }
    }

    pub fn batch_options(
        &self,
        kind: Option<ChecksumKind>,
        concurrency: Option<usize>,
        now: DateTime<Utc>,
    ) -> BatchOptions {
        BatchOptions {
            verify: self.verify_options(kind, now),
            concurrency: concurrency.unwrap_or(self.concurrency),
        }
    }

    async fn load(&self, id: RecordId) -> Result<IntegrityRecord, IntegrityError> {
        self.store
            .get(id)
            .await?
            .ok_or(IntegrityError::NotFound(id))
    }

    pub async fn get(&self, id: RecordId) -> Result<IntegrityRecord, IntegrityError> {
        self.load(id).await
    }

    #[instrument(skip_all, fields(owner_id = input.owner_id))]
    pub async fn register_record(
        &self,
        input: NewRecord,
        now: DateTime<Utc>,
    ) -> Result<IntegrityRecord, IntegrityError> {
        let record = IntegrityRecord::new(input, now)?;
        self.store.insert(&record).await?;
        info!(record_id = %record.id, path = %record.stored_path, location = %record.location_kind, "Integrity record registered");
        Ok(record)
    }

    #[instrument(skip(self), fields(record_id = %id))]
    pub async fn begin_upload(
        &self,
        id: RecordId,
        now: DateTime<Utc>,
    ) -> Result<IntegrityRecord, IntegrityError> {
        let _guard = self.locks.lock(id).await;
        let mut record = self.load(id).await?;
        record.begin_upload(now)?;
        self.store.save(&record).await?;
        Ok(record)
    }

    /// Compute both fingerprints and make them the record's new baseline.
    ///
    /// On any failure the record is left exactly as it was.
    #[instrument(skip(self, source), fields(record_id = %id))]
    pub async fn calculate_checksum(
        &self,
        id: RecordId,
        source: ByteSource,
        now: DateTime<Utc>,
    ) -> Result<IntegrityRecord, IntegrityError> {
        let record = self.load(id).await?;

        let fingerprint = match source {
            ByteSource::Stored => self
                .read_fingerprint(&record, self.read_timeout)
                .await
                .map_err(IntegrityError::from)?,
            ByteSource::Upload {
                mut reader,
                declared_size,
            } => {
                let calculator = self.calculator.with_limit(self.max_upload_bytes);
                if let Some(size) = declared_size {
                    calculator.check_declared_size(size)?;
                }
                calculator.calculate(&mut reader).await?
            }
        };

        let _guard = self.locks.lock(id).await;
        let mut record = self.load(id).await?;
        record.apply_fingerprint(&fingerprint, now)?;
        self.store.save(&record).await?;

        info!(
            size_bytes = record.size_bytes,
            sha256 = %fingerprint.sha256,
            "Checksums calculated"
        );
        Ok(record)
    }

    /// Recompute the selected digest from the live blob and record the outcome.
    ///
    /// Corruption and unreadable blobs are outcomes, not errors. Errors are
    /// reserved for an unknown id, a record with no baseline that could be
    /// read, and store failures.
    #[instrument(skip(self, options), fields(record_id = %id, kind = %options.checksum_kind))]
    pub async fn verify_one(
        &self,
        id: RecordId,
        options: &VerifyOptions,
    ) -> Result<VerificationResult, IntegrityError> {
        let snapshot = self.load(id).await?;
        let read = self.read_fingerprint(&snapshot, options.read_timeout).await;

        let _guard = self.locks.lock(id).await;
        let mut record = self.load(id).await?;
        let kind = options.checksum_kind;

        let outcome = match read {
            Ok(fingerprint) => {
                let recorded = record
                    .checksums
                    .ok_or(IntegrityError::ChecksumNotComputed(id))?;
                if recorded.matches(&fingerprint, kind) {
                    record.mark_verified(options.now, kind.into())?;
                    VerificationOutcome::Verified
                } else {
                    let error = format!(
                        "{kind} mismatch: expected {}, got {}",
                        recorded.hex(kind),
                        fingerprint.hex(kind)
                    );
                    record.mark_corrupted(options.now, kind, error)?;
                    VerificationOutcome::Corrupted
                }
            }
            Err(failure) => {
                record.mark_missing(options.now, kind, failure.detail())?;
                VerificationOutcome::Missing
            }
        };

        self.store.save(&record).await?;

        match outcome {
            VerificationOutcome::Verified => info!("Record verified"),
            _ => warn!(
                outcome = ?outcome,
                error = record.verification_error.as_deref().unwrap_or_default(),
                "Record failed verification"
            ),
        }

        Ok(VerificationResult {
            record_id: id,
            outcome,
            status: record.status,
            error: record.verification_error.clone(),
            verified_at: options.now,
            checksum_kind: kind,
        })
    }

    /// Verify many records through a bounded worker pool.
    ///
    /// Every id is resolved before anything is dispatched, so an unknown id
    /// fails the call without touching any record. After that the call
    /// always returns a complete report; details follow the input order.
    #[instrument(skip_all, fields(records = ids.len(), kind = %options.verify.checksum_kind))]
    pub async fn verify_batch(
        &self,
        ids: &[RecordId],
        options: &BatchOptions,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, IntegrityError> {
        if ids.is_empty() {
            return Err(IntegrityError::EmptyBatch);
        }
        for &id in ids {
            if self.store.get(id).await?.is_none() {
                return Err(IntegrityError::NotFound(id));
            }
        }

        let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
        let mut tasks = DetachOnDrop(JoinSet::new());
        let mut task_index = HashMap::new();
        let mut results: Vec<(usize, RecordId, Result<VerificationResult, String>)> =
            Vec::with_capacity(ids.len());

        for (index, &id) in ids.iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                for (rest, &rest_id) in ids.iter().enumerate().skip(index) {
                    results.push((rest, rest_id, Err("batch cancelled".into())));
                }
                break;
            };

            let service = self.clone();
            let verify = options.verify;
            let handle = tasks.0.spawn(async move {
                let _permit = permit;
                service
                    .verify_one(id, &verify)
                    .await
                    .map_err(|e| e.to_string())
            });
            task_index.insert(handle.id(), (index, id));
        }

        while let Some(joined) = tasks.0.join_next_with_id().await {
            match joined {
                Ok((task_id, result)) => {
                    if let Some(&(index, id)) = task_index.get(&task_id) {
                        results.push((index, id, result));
                    }
                }
                Err(join_err) => {
                    if let Some(&(index, id)) = task_index.get(&join_err.id()) {
                        warn!(record_id = %id, error = %join_err, "Verification task failed");
                        results.push((index, id, Err("verification task failed".into())));
                    }
                }
            }
        }

        results.sort_by_key(|(index, _, _)| *index);
        let mut report = BatchReport::default();
        for (_, id, result) in results {
            match result {
                Ok(result) => report.record(&result),
                Err(reason) => report.record_skipped(id, reason),
            }
        }

        info!(
            total = report.total,
            verified = report.verified,
            corrupted = report.corrupted,
            missing = report.missing,
            skipped = report.skipped,
            "Batch verification complete"
        );
        Ok(report)
    }

    /// Operator override: mark a record verified without reading it.
    ///
    /// The record must already carry checksums. The trail records the
    /// method as `asserted`.
    #[instrument(skip(self), fields(record_id = %id))]
    pub async fn mark_verified_without_check(
        &self,
        id: RecordId,
        now: DateTime<Utc>,
    ) -> Result<IntegrityRecord, IntegrityError> {
        let _guard = self.locks.lock(id).await;
        let mut record = self.load(id).await?;
        record.mark_verified(now, VerificationMethod::Asserted)?;
        self.store.save(&record).await?;
        warn!("Record marked verified without a check");
        Ok(record)
    }

    pub async fn query_by_status(
        &self,
        status: IntegrityStatus,
    ) -> Result<Vec<IntegrityRecord>, IntegrityError> {
        Ok(self.store.list(&RecordFilter::by_status(status)).await?)
    }

    pub async fn query_by_owner(
        &self,
        owner_id: i32,
    ) -> Result<Vec<IntegrityRecord>, IntegrityError> {
        Ok(self.store.list(&RecordFilter::by_owner(owner_id)).await?)
    }

    /// Stream the record's blob once through the calculator.
    async fn read_fingerprint(
        &self,
        record: &IntegrityRecord,
        timeout: Option<Duration>,
    ) -> Result<Fingerprint, ReadFailure> {
        let read = async {
            let mut reader = self
                .sources
                .open(record.location_kind, &record.stored_path)
                .await
                .map_err(|e| ReadFailure::Source(e.to_string()))?;
            self.calculator
                .calculate(&mut reader)
                .await
                .map_err(ReadFailure::Checksum)
        };

        match timeout {
            Some(limit) => tokio::time::timeout(limit, read).await.unwrap_or_else(|_| {
                Err(ReadFailure::Source(format!("read timed out after {limit:?}")))
            }),
            None => read.await,
        }
    }
}
