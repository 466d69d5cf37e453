//! Job records, statuses, and retry policies.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use forgescan_core::TenantId;

/// Unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

forgescan_core::impl_uuid_newtype!(JobId, "JobId");

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

/// Job kind, used to route a job to its handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Document extraction job. The type string routes within the
    /// `extraction.` family (e.g. `extraction.invoice`).
    Extraction { job_type: String },
    /// Generic/custom job.
    Custom { kind: String },
}

impl JobKind {
    pub fn extraction(job_type: impl Into<String>) -> Self {
        Self::Extraction {
            job_type: job_type.into(),
        }
    }

    pub fn custom(kind: impl Into<String>) -> Self {
        Self::Custom { kind: kind.into() }
    }

    /// The routing key handlers are registered against.
    pub fn type_name(&self) -> &str {
        match self {
            JobKind::Extraction { job_type } => job_type,
            JobKind::Custom { kind } => kind,
        }
    }
}

/// Where a job sits in its lifecycle.
///
/// `pending → running → completed`, or `running → failed → pending` (via
/// backoff) until the attempt budget runs out and the job becomes
/// `dead_lettered`. Pending jobs can also be `cancelled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed { error: String, attempt: u32 },
    DeadLettered { error: String, attempts: u32 },
    Cancelled,
}

impl JobStatus {
    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::DeadLettered { .. } | JobStatus::Cancelled
        )
    }

    /// Failed-but-not-exhausted jobs are claimed again once their backoff
    /// expires.
    pub fn is_retriable(&self) -> bool {
        matches!(self, JobStatus::Failed { .. })
    }
}

/// How the delay between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Same delay every time.
    Fixed,
    /// `base * 2^(attempt-1)`, capped at the max delay.
    Exponential,
    /// `base * attempt`, capped at the max delay.
    Linear,
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential
    }
}

/// Retry policy attached to a job at enqueue time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt (0 = one attempt total).
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub strategy: BackoffStrategy,
    /// Jitter factor in `0.0..=1.0`, applied around the computed delay.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            strategy: BackoffStrategy::Exponential,
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Policy with no retries. The extraction flow runs one attempt only.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            ..Default::default()
        }
    }

    /// Policy with a fixed delay between attempts.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Fixed,
            jitter: 0.0,
        }
    }

    /// Policy with exponential backoff.
    pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            strategy: BackoffStrategy::Exponential,
            jitter: 0.1,
        }
    }

    /// Whether another attempt is allowed after `attempt` attempts.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay before the given attempt number (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let cap = self.max_delay.as_millis() as f64;
        let raw = match self.strategy {
            BackoffStrategy::Fixed => self.base_delay.as_millis() as f64,
            BackoffStrategy::Exponential => {
                self.base_delay.as_millis() as f64 * 2_f64.powi(attempt as i32 - 1)
            }
            BackoffStrategy::Linear => self.base_delay.as_millis() as f64 * f64::from(attempt),
        };
        let delay = raw.min(cap);

        // Deterministic jitter: a pseudo-random offset in
        // `±(jitter * delay)`, derived from the attempt number so tests
        // stay reproducible.
        let unit = f64::from((attempt.wrapping_mul(17)) % 100) / 50.0 - 1.0;
        let jittered = delay + delay * self.jitter * unit;

        Duration::from_millis(jittered.max(0.0) as u64)
    }
}

/// A tenant-scoped background job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub tenant_id: TenantId,
    /// Routing kind (see [`JobKind::type_name`]).
    pub kind: JobKind,
    /// Opaque JSON payload interpreted by the handler.
    pub payload: serde_json::Value,
    pub status: JobStatus,
    pub retry_policy: RetryPolicy,
    /// Attempts started so far (0 before the first claim).
    pub attempt: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Earliest time the job may run (delayed jobs, retry backoff).
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Outcome of every attempt so far.
    pub history: Vec<JobAttemptRecord>,
}

/// Record of one job execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobAttemptRecord {
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl Job {
    pub fn new(tenant_id: TenantId, kind: JobKind, payload: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            tenant_id,
            kind,
            payload,
            status: JobStatus::Pending,
            retry_policy: RetryPolicy::default(),
            attempt: 0,
            created_at: now,
            updated_at: now,
            scheduled_at: None,
            history: Vec::new(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Schedule the job for a fixed point in time.
    pub fn scheduled_at(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    /// Schedule the job with a delay from now.
    pub fn delayed(self, delay: Duration) -> Self {
        self.scheduled_at(Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default())
    }

    /// Whether the job may run now.
    pub fn is_ready(&self) -> bool {
        self.scheduled_at.map_or(true, |at| Utc::now() >= at)
    }

    pub fn mark_running(&mut self) {
        self.status = JobStatus::Running;
        self.attempt += 1;
        self.updated_at = Utc::now();
    }

    pub fn mark_completed(&mut self, started_at: DateTime<Utc>) {
        self.push_attempt(started_at, None);
        self.status = JobStatus::Completed;
    }

    /// Record a failed attempt. Schedules a retry with backoff while the
    /// policy allows it, otherwise the job becomes dead-lettered.
    pub fn mark_failed(&mut self, error: String, started_at: DateTime<Utc>) {
        self.push_attempt(started_at, Some(error.clone()));

        if self.retry_policy.should_retry(self.attempt) {
            let backoff = self.retry_policy.delay_for_attempt(self.attempt);
            self.scheduled_at =
                Some(self.updated_at + chrono::Duration::from_std(backoff).unwrap_or_default());
            self.status = JobStatus::Failed {
                error,
                attempt: self.attempt,
            };
        } else {
            self.status = JobStatus::DeadLettered {
                error,
                attempts: self.attempt,
            };
        }
    }

    pub fn mark_cancelled(&mut self) {
        self.status = JobStatus::Cancelled;
        self.updated_at = Utc::now();
    }

    fn push_attempt(&mut self, started_at: DateTime<Utc>, error: Option<String>) {
        let now = Utc::now();
        self.updated_at = now;
        self.history.push(JobAttemptRecord {
            attempt: self.attempt,
            started_at,
            finished_at: now,
            success: error.is_none(),
            error,
            duration_ms: (now - started_at).num_milliseconds().max(0) as u64,
        });
    }
}

/// Outcome a handler reports for one attempt.
#[derive(Debug)]
pub enum JobResult {
    Success,
    Failure(String),
    /// Transient failure; retry without waiting for the policy backoff.
    RetryNow,
    /// Transient failure; retry after the given delay.
    RetryAfter(Duration),
}

/// Entry in the dead-letter queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub job: Job,
    pub dead_lettered_at: DateTime<Utc>,
    pub reason: String,
}

impl DeadLetterEntry {
    pub fn new(job: Job, reason: String) -> Self {
        Self {
            job,
            dead_lettered_at: Utc::now(),
            reason,
        }
    }
}
