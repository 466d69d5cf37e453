//! Background worker that drains the job queue.

use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use forgescan_core::TenantId;

use super::store::JobStore;
use super::types::{Job, JobKind, JobResult, JobStatus};

/// Handler invoked for one job attempt.
pub type JobHandler = Box<dyn Fn(&Job) -> JobResult + Send + Sync>;

#[derive(Debug, Clone)]
pub struct JobExecutorConfig {
    /// Idle wait between claim attempts when the queue is empty.
    pub poll_interval: Duration,
    /// Thread name, also used in log lines.
    pub name: String,
    /// Restrict claims to one tenant; `None` drains all tenants.
    pub tenant_id: Option<TenantId>,
}

impl Default for JobExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            name: "job-executor".to_string(),
            tenant_id: None,
        }
    }
}

impl JobExecutorConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }
}

/// Handle held by the owner of a spawned executor.
#[derive(Debug)]
pub struct JobExecutorHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    stats: Arc<Mutex<ExecutorStats>>,
}

impl JobExecutorHandle {
    /// Signal the worker thread and wait for it to finish its current job.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }

    pub fn stats(&self) -> ExecutorStats {
        self.stats.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ExecutorStats {
    pub jobs_processed: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub jobs_dead_lettered: u64,
    pub uptime_secs: u64,
}

impl ExecutorStats {
    fn record(&mut self, succeeded: bool, dead_lettered: bool) {
        self.jobs_processed += 1;
        if succeeded {
            self.jobs_succeeded += 1;
        } else {
            self.jobs_failed += 1;
            if dead_lettered {
                self.jobs_dead_lettered += 1;
            }
        }
    }
}

/// Single-threaded job worker.
///
/// Claims ready jobs from the store and routes each to a registered handler.
/// A failure runs through the job's retry policy; once the attempt budget is
/// spent the job lands in the dead-letter queue.
pub struct JobExecutor<S: JobStore> {
    store: S,
    handlers: HashMap<String, JobHandler>,
}

impl<S: JobStore + 'static> JobExecutor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under a routing pattern: an exact key
    /// (`extraction.invoice`), a family (`extraction.*`), or `*`.
    pub fn register_handler<F>(&mut self, kind_pattern: impl Into<String>, handler: F)
    where
        F: Fn(&Job) -> JobResult + Send + Sync + 'static,
    {
        self.handlers.insert(kind_pattern.into(), Box::new(handler));
    }

    /// Resolution order: exact key, then family pattern, then catch-all.
    fn route(&self, kind: &JobKind) -> Option<&JobHandler> {
        let key = kind.type_name();
        if let Some(handler) = self.handlers.get(key) {
            return Some(handler);
        }

        let family = self.handlers.iter().find_map(|(pattern, handler)| {
            pattern
                .strip_suffix(".*")
                .filter(|prefix| key.starts_with(prefix))
                .map(|_| handler)
        });

        family.or_else(|| self.handlers.get("*"))
    }

    /// Move the executor onto its own thread and start draining the queue.
    pub fn spawn(self, config: JobExecutorConfig) -> JobExecutorHandle
    where
        S: Send,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let stats = Arc::new(Mutex::new(ExecutorStats::default()));
        let worker_stats = stats.clone();

        let join = thread::Builder::new()
            .name(config.name.clone())
            .spawn(move || self.run(config, shutdown_rx, worker_stats))
            .expect("failed to spawn job executor thread");

        JobExecutorHandle {
            shutdown: shutdown_tx,
            join: Some(join),
            stats,
        }
    }

    fn run(
        self,
        config: JobExecutorConfig,
        shutdown_rx: mpsc::Receiver<()>,
        stats: Arc<Mutex<ExecutorStats>>,
    ) {
        info!(executor = %config.name, "job executor started");
        let started_at = Instant::now();

        loop {
            stats.lock().unwrap().uptime_secs = started_at.elapsed().as_secs();

            let claimed = match self.store.claim_next(config.tenant_id) {
                Ok(claimed) => claimed,
                Err(e) => {
                    error!(executor = %config.name, error = ?e, "failed to claim job");
                    None
                }
            };

            let Some(mut job) = claimed else {
                // Idle: block on the shutdown channel for one poll interval.
                match shutdown_rx.recv_timeout(config.poll_interval) {
                    Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    Err(mpsc::RecvTimeoutError::Timeout) => continue,
                }
            };

            debug!(
                executor = %config.name,
                job_id = %job.id,
                kind = job.kind.type_name(),
                attempt = job.attempt,
                "claimed job"
            );

            let outcome = self.execute_one(&mut job);
            let dead = matches!(job.status, JobStatus::DeadLettered { .. });
            stats.lock().unwrap().record(outcome.is_ok(), dead);

            if let Err(e) = outcome {
                debug!(
                    executor = %config.name,
                    job_id = %job.id,
                    error = %e,
                    status = ?job.status,
                    "job execution failed"
                );
            }

            // Check for shutdown between jobs so a busy queue cannot starve
            // the signal.
            if matches!(shutdown_rx.try_recv(), Ok(()) | Err(mpsc::TryRecvError::Disconnected)) {
                break;
            }
        }

        info!(executor = %config.name, "job executor stopped");
    }

    /// Run one already-claimed job (the store marked it running) and record
    /// the outcome.
    pub fn execute_one(&self, job: &mut Job) -> Result<(), String> {
        let started = Utc::now();

        let Some(handler) = self.route(&job.kind) else {
            let error = format!("no handler for job kind: {}", job.kind.type_name());
            warn!(job_id = %job.id, error = %error, "unroutable job");
            return self.record_failure(job, error, started, None);
        };

        match handler(job) {
            JobResult::Success => {
                job.mark_completed(started);
                self.store.update(job).map_err(|e| e.to_string())?;
                debug!(job_id = %job.id, "job completed");
                Ok(())
            }
            JobResult::Failure(error) => self.record_failure(job, error, started, None),
            JobResult::RetryNow => self.record_failure(
                job,
                "retry requested".to_string(),
                started,
                Some(Duration::ZERO),
            ),
            JobResult::RetryAfter(delay) => {
                self.record_failure(job, "retry after delay".to_string(), started, Some(delay))
            }
        }
    }

    /// Record a failed attempt. `reschedule` overrides the policy backoff for
    /// jobs that are still retriable; exhausted jobs move to the DLQ.
    fn record_failure(
        &self,
        job: &mut Job,
        error: String,
        started: DateTime<Utc>,
        reschedule: Option<Duration>,
    ) -> Result<(), String> {
        job.mark_failed(error.clone(), started);

        if job.status.is_retriable() {
            if let Some(delay) = reschedule {
                job.scheduled_at = if delay.is_zero() {
                    None
                } else {
                    Some(Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default())
                };
            }
        }

        self.store.update(job).map_err(|e| e.to_string())?;

        if matches!(job.status, JobStatus::DeadLettered { .. }) {
            warn!(job_id = %job.id, error = %error, "job dead-lettered");
            self.store
                .dead_letter(job.clone(), error.clone())
                .map_err(|e| e.to_string())?;
        }

        Err(error)
    }
}
