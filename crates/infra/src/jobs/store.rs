//! Job storage.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;

use forgescan_core::TenantId;

use super::types::{DeadLetterEntry, Job, JobId, JobStatus};

/// Storage behind the job queue. Every read is scoped to a tenant; a lookup
/// that lands on another tenant's job is reported as an isolation error, not
/// as absence.
pub trait JobStore: Send + Sync {
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError>;

    fn get(&self, tenant_id: TenantId, job_id: JobId) -> Result<Option<Job>, JobStoreError>;

    fn update(&self, job: &Job) -> Result<(), JobStoreError>;

    /// Take the oldest ready job and mark it running. `None` tenant claims
    /// across all tenants (single-process worker).
    fn claim_next(&self, tenant_id: Option<TenantId>) -> Result<Option<Job>, JobStoreError>;

    fn list_by_status(
        &self,
        tenant_id: TenantId,
        status: Option<JobStatus>,
        limit: usize,
    ) -> Result<Vec<Job>, JobStoreError>;

    /// Remove a job from the queue and park it in the dead-letter queue.
    fn dead_letter(&self, job: Job, reason: String) -> Result<(), JobStoreError>;

    fn get_dead_letter(
        &self,
        tenant_id: TenantId,
        job_id: JobId,
    ) -> Result<Option<DeadLetterEntry>, JobStoreError>;

    fn list_dead_letters(
        &self,
        tenant_id: TenantId,
        limit: usize,
    ) -> Result<Vec<DeadLetterEntry>, JobStoreError>;

    /// Move a dead letter back to the queue with a fresh attempt budget.
    fn retry_dead_letter(&self, tenant_id: TenantId, job_id: JobId) -> Result<Job, JobStoreError>;

    fn delete_dead_letter(&self, tenant_id: TenantId, job_id: JobId) -> Result<(), JobStoreError>;

    fn stats(&self, tenant_id: TenantId) -> Result<JobStats, JobStoreError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("tenant isolation violation")]
    TenantIsolation,
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Per-tenant job counts, including the dead-letter queue.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct JobStats {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub dead_lettered: usize,
    pub cancelled: usize,
}

impl JobStats {
    fn count(&mut self, status: &JobStatus) {
        match status {
            JobStatus::Pending => self.pending += 1,
            JobStatus::Running => self.running += 1,
            JobStatus::Completed => self.completed += 1,
            JobStatus::Failed { .. } => self.failed += 1,
            JobStatus::DeadLettered { .. } => self.dead_lettered += 1,
            JobStatus::Cancelled => self.cancelled += 1,
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    queue: HashMap<JobId, Job>,
    dead: HashMap<JobId, DeadLetterEntry>,
}

impl StoreState {
    /// Oldest pending-or-retriable job that is due, FIFO by creation time.
    fn next_ready(&self, tenant_id: Option<TenantId>) -> Option<JobId> {
        self.queue
            .values()
            .filter(|j| {
                (matches!(j.status, JobStatus::Pending) || j.status.is_retriable())
                    && j.is_ready()
                    && tenant_id.map_or(true, |t| j.tenant_id == t)
            })
            .min_by_key(|j| j.created_at)
            .map(|j| j.id)
    }
}

/// In-memory store backing tests and the dev server. A single lock guards
/// both the queue and the dead-letter queue so moves between them are atomic.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    state: RwLock<StoreState>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl JobStore for InMemoryJobStore {
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError> {
        let mut state = self.state.write().unwrap();
        if state.queue.contains_key(&job.id) {
            return Err(JobStoreError::AlreadyExists(job.id));
        }
        let id = job.id;
        state.queue.insert(id, job);
        Ok(id)
    }

    fn get(&self, tenant_id: TenantId, job_id: JobId) -> Result<Option<Job>, JobStoreError> {
        let state = self.state.read().unwrap();
        match state.queue.get(&job_id) {
            None => Ok(None),
            Some(job) if job.tenant_id != tenant_id => Err(JobStoreError::TenantIsolation),
            Some(job) => Ok(Some(job.clone())),
        }
    }

    fn update(&self, job: &Job) -> Result<(), JobStoreError> {
        let mut state = self.state.write().unwrap();
        match state.queue.get_mut(&job.id) {
            Some(slot) => {
                *slot = job.clone();
                Ok(())
            }
            None => Err(JobStoreError::NotFound(job.id)),
        }
    }

    fn claim_next(&self, tenant_id: Option<TenantId>) -> Result<Option<Job>, JobStoreError> {
        let mut state = self.state.write().unwrap();

        let Some(id) = state.next_ready(tenant_id) else {
            return Ok(None);
        };
        match state.queue.get_mut(&id) {
            Some(job) => {
                job.mark_running();
                Ok(Some(job.clone()))
            }
            None => Ok(None),
        }
    }

    fn list_by_status(
        &self,
        tenant_id: TenantId,
        status: Option<JobStatus>,
        limit: usize,
    ) -> Result<Vec<Job>, JobStoreError> {
        let state = self.state.read().unwrap();
        let wanted = status.as_ref().map(std::mem::discriminant);

        let mut jobs: Vec<Job> = state
            .queue
            .values()
            .filter(|j| j.tenant_id == tenant_id)
            .filter(|j| wanted.map_or(true, |d| std::mem::discriminant(&j.status) == d))
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs.truncate(limit);
        Ok(jobs)
    }

    fn dead_letter(&self, mut job: Job, reason: String) -> Result<(), JobStoreError> {
        let mut state = self.state.write().unwrap();

        job.status = JobStatus::DeadLettered {
            error: reason.clone(),
            attempts: job.attempt,
        };
        job.updated_at = Utc::now();

        let id = job.id;
        state.queue.remove(&id);
        state.dead.insert(id, DeadLetterEntry::new(job, reason));
        Ok(())
    }

    fn get_dead_letter(
        &self,
        tenant_id: TenantId,
        job_id: JobId,
    ) -> Result<Option<DeadLetterEntry>, JobStoreError> {
        let state = self.state.read().unwrap();
        match state.dead.get(&job_id) {
            None => Ok(None),
            Some(entry) if entry.job.tenant_id != tenant_id => Err(JobStoreError::TenantIsolation),
            Some(entry) => Ok(Some(entry.clone())),
        }
    }

    fn list_dead_letters(
        &self,
        tenant_id: TenantId,
        limit: usize,
    ) -> Result<Vec<DeadLetterEntry>, JobStoreError> {
        let state = self.state.read().unwrap();
        let mut entries: Vec<DeadLetterEntry> = state
            .dead
            .values()
            .filter(|e| e.job.tenant_id == tenant_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.dead_lettered_at);
        entries.truncate(limit);
        Ok(entries)
    }

    fn retry_dead_letter(&self, tenant_id: TenantId, job_id: JobId) -> Result<Job, JobStoreError> {
        let mut state = self.state.write().unwrap();

        match state.dead.get(&job_id) {
            None => return Err(JobStoreError::NotFound(job_id)),
            Some(entry) if entry.job.tenant_id != tenant_id => {
                return Err(JobStoreError::TenantIsolation)
            }
            Some(_) => {}
        }

        let entry = state
            .dead
            .remove(&job_id)
            .ok_or(JobStoreError::NotFound(job_id))?;
        let mut job = entry.job;
        job.status = JobStatus::Pending;
        job.attempt = 0;
        job.scheduled_at = None;
        job.history.clear();
        job.updated_at = Utc::now();

        state.queue.insert(job.id, job.clone());
        Ok(job)
    }

    fn delete_dead_letter(&self, tenant_id: TenantId, job_id: JobId) -> Result<(), JobStoreError> {
        let mut state = self.state.write().unwrap();
        match state.dead.get(&job_id) {
            None => Err(JobStoreError::NotFound(job_id)),
            Some(entry) if entry.job.tenant_id != tenant_id => Err(JobStoreError::TenantIsolation),
            Some(_) => {
                state.dead.remove(&job_id);
                Ok(())
            }
        }
    }

    fn stats(&self, tenant_id: TenantId) -> Result<JobStats, JobStoreError> {
        let state = self.state.read().unwrap();
        let mut stats = JobStats::default();

        for job in state.queue.values().filter(|j| j.tenant_id == tenant_id) {
            stats.count(&job.status);
        }
        stats.dead_lettered += state
            .dead
            .values()
            .filter(|e| e.job.tenant_id == tenant_id)
            .count();

        Ok(stats)
    }
}

impl<S: JobStore + ?Sized> JobStore for Arc<S> {
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError> {
        (**self).enqueue(job)
    }

    fn get(&self, tenant_id: TenantId, job_id: JobId) -> Result<Option<Job>, JobStoreError> {
        (**self).get(tenant_id, job_id)
    }

    fn update(&self, job: &Job) -> Result<(), JobStoreError> {
        (**self).update(job)
    }

    fn claim_next(&self, tenant_id: Option<TenantId>) -> Result<Option<Job>, JobStoreError> {
        (**self).claim_next(tenant_id)
    }

    fn list_by_status(
        &self,
        tenant_id: TenantId,
        status: Option<JobStatus>,
        limit: usize,
    ) -> Result<Vec<Job>, JobStoreError> {
        (**self).list_by_status(tenant_id, status, limit)
    }

    fn dead_letter(&self, job: Job, reason: String) -> Result<(), JobStoreError> {
        (**self).dead_letter(job, reason)
    }

    fn get_dead_letter(
        &self,
        tenant_id: TenantId,
        job_id: JobId,
    ) -> Result<Option<DeadLetterEntry>, JobStoreError> {
        (**self).get_dead_letter(tenant_id, job_id)
    }

    fn list_dead_letters(
        &self,
        tenant_id: TenantId,
        limit: usize,
    ) -> Result<Vec<DeadLetterEntry>, JobStoreError> {
        (**self).list_dead_letters(tenant_id, limit)
    }

    fn retry_dead_letter(&self, tenant_id: TenantId, job_id: JobId) -> Result<Job, JobStoreError> {
        (**self).retry_dead_letter(tenant_id, job_id)
    }

    fn delete_dead_letter(&self, tenant_id: TenantId, job_id: JobId) -> Result<(), JobStoreError> {
        (**self).delete_dead_letter(tenant_id, job_id)
    }

    fn stats(&self, tenant_id: TenantId) -> Result<JobStats, JobStoreError> {
        (**self).stats(tenant_id)
    }
}
