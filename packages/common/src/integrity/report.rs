use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::record::RecordId;
use crate::status::{ChecksumKind, IntegrityStatus};

/// Result of comparing current bytes against the recorded fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    Verified,
    Corrupted,
    Missing,
}

impl VerificationOutcome {
    pub fn status(self) -> IntegrityStatus {
        match self {
            Self::Verified => IntegrityStatus::Verified,
            Self::Corrupted => IntegrityStatus::Corrupted,
            Self::Missing => IntegrityStatus::Missing,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VerificationResult {
    pub record_id: Uuid,
    pub outcome: VerificationOutcome,
    pub status: IntegrityStatus,
    /// Mismatch or read failure detail. Absent when verified.
    pub error: Option<String>,
    pub verified_at: DateTime<Utc>,
    pub checksum_kind: ChecksumKind,
}

/// Per-record outcome inside a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    Verified,
    Corrupted,
    Missing,
    /// Not verified: the batch was cancelled first or the check could not start.
    Skipped,
}

impl From<VerificationOutcome> for BatchOutcome {
    fn from(outcome: VerificationOutcome) -> Self {
        match outcome {
            VerificationOutcome::Verified => Self::Verified,
            VerificationOutcome::Corrupted => Self::Corrupted,
            VerificationOutcome::Missing => Self::Missing,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchDetail {
    pub record_id: Uuid,
    pub outcome: BatchOutcome,
    pub error: Option<String>,
}

/// Aggregate of a batch run. The four buckets always sum to `total`.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct BatchReport {
    pub total: usize,
    pub verified: usize,
    pub corrupted: usize,
    pub missing: usize,
    pub skipped: usize,
    pub details: Vec<BatchDetail>,
}

impl BatchReport {
    pub fn record(&mut self, result: &VerificationResult) {
        self.push(result.record_id, result.outcome.into(), result.error.clone());
    }

    pub fn record_skipped(&mut self, record_id: RecordId, reason: impl Into<String>) {
        self.push(record_id, BatchOutcome::Skipped, Some(reason.into()));
    }

    fn push(&mut self, record_id: RecordId, outcome: BatchOutcome, error: Option<String>) {
        self.total += 1;
        match outcome {
            BatchOutcome::Verified => self.verified += 1,
            BatchOutcome::Corrupted => self.corrupted += 1,
            BatchOutcome::Missing => self.missing += 1,
            BatchOutcome::Skipped => self.skipped += 1,
        }
        self.details.push(BatchDetail {
            record_id,
            outcome,
            error,
        });
    }

    pub fn failures(&self) -> impl Iterator<Item = &BatchDetail> {
        self.details
            .iter()
            .filter(|d| d.outcome != BatchOutcome::Verified)
    }
}

#[cfg(test)]
mod tests {
    use utoipa::PartialSchema;

    use super::*;

    #[test]
    fn record_ids_are_documented_as_uuids() {
        for schema in [VerificationResult::schema(), BatchDetail::schema()] {
            let schema = serde_json::to_value(schema).unwrap();
            assert_eq!(schema["properties"]["record_id"]["type"], "string");
            assert_eq!(schema["properties"]["record_id"]["format"], "uuid");
        }
    }

    #[test]
    fn buckets_sum_to_total() {
        let mut report = BatchReport::default();
        for outcome in [
            VerificationOutcome::Verified,
            VerificationOutcome::Corrupted,
            VerificationOutcome::Missing,
        ] {
            report.record(&VerificationResult {
                record_id: Uuid::now_v7(),
                outcome,
                status: outcome.status(),
                error: None,
                verified_at: Utc::now(),
                checksum_kind: ChecksumKind::Sha256,
            });
        }
        report.record_skipped(Uuid::now_v7(), "cancelled");

        assert_eq!(report.total, 4);
        assert_eq!(
            report.verified + report.corrupted + report.missing + report.skipped,
            report.total
        );
        assert_eq!(report.failures().count(), 3);
    }
}
