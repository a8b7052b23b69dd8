mod error;
mod locks;
mod memory;
mod record;
mod report;
mod service;
mod store;

pub use error::IntegrityError;
pub use locks::{RecordLockGuard, RecordLocks};
pub use memory::MemoryRecordStore;
pub use record::{Checksums, IntegrityRecord, NewRecord, RecordId, format_size};
pub use report::{BatchDetail, BatchOutcome, BatchReport, VerificationOutcome, VerificationResult};
pub use service::{BatchOptions, ByteSource, VerificationService, VerifyOptions};
pub use store::{RecordFilter, RecordOrder, RecordStore, StoreError};
