//! Background job system with retry, backoff, and dead-letter handling.
//!
//! ## Design
//!
//! - Jobs are tenant-scoped and typed
//! - Retry policy with fixed/linear/exponential backoff (extraction jobs
//!   run with `no_retry`)
//! - Dead-letter queue for jobs whose attempts are exhausted
//! - Visibility into job status, history, and failures
//!
//! ## Components
//!
//! - `Job`: the job record with payload and metadata
//! - `JobStore`: persistence for jobs (in-memory for tests/dev)
//! - `JobExecutor`: claims and runs jobs with retry logic

pub mod executor;
pub mod store;
pub mod types;

pub use executor::{ExecutorStats, JobExecutor, JobExecutorConfig, JobExecutorHandle};
pub use store::{InMemoryJobStore, JobStats, JobStore, JobStoreError};
pub use types::{
    BackoffStrategy, DeadLetterEntry, Job, JobId, JobKind, JobResult, JobStatus, RetryPolicy,
};
