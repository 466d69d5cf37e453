//! Infrastructure layer: job queue, tenant-scoped stores, file storage, and
//! the invoice-extraction worker.

pub mod extraction_runner;
pub mod files;
pub mod jobs;
pub mod matching;
pub mod store;

pub use extraction_runner::{
    extraction_job, register_extraction_handler, ExtractionDeps, INVOICE_EXTRACTION_JOB,
};
pub use files::{FileStore, FileStoreError, InMemoryFileStore, LocalDirFileStore, StoredFile};
pub use jobs::{
    DeadLetterEntry, ExecutorStats, InMemoryJobStore, Job, JobExecutor, JobExecutorConfig,
    JobExecutorHandle, JobId, JobKind, JobResult, JobStats, JobStatus, JobStore, JobStoreError,
    RetryPolicy,
};
pub use matching::{match_capture, CaptureMatch, RowMatch};
pub use store::{InMemoryTenantStore, TenantStore};
