//! Persistence contract consumed by the engine and runners.

use serde_json::Value;

use crate::error::Result;
use crate::types::{Execution, Job, SkippedPolicy, Status};

/// Durable record of jobs and their execution history.
///
/// Implementations serialize access per row; the scheduler adds no locking of
/// its own. Methods may block briefly — they are called from async tasks, so
/// they must stay cheap. Any backend exposing these operations is
/// substitutable: the `cronkeep-sqlite` crate ships the SQLite one,
/// [`crate::MemoryStore`] the in-process one.
pub trait JobStore: Send + Sync {
    /// Persist a new job: fresh id, status [`Status::Created`], `created_at`
    /// set to now. Fails with `SchedulerError::InvalidCron` when the
    /// expression does not parse.
    fn create_job(
        &self,
        cron: &str,
        payload: Value,
        max_executions: Option<u32>,
        skipped: SkippedPolicy,
    ) -> Result<Job>;

    /// All jobs whose status matches any of `statuses`.
    fn jobs_by_status(&self, statuses: &[Status]) -> Result<Vec<Job>>;

    /// Guarded status write: terminal statuses are never overwritten, and
    /// unknown ids are a no-op. This makes cancellation idempotent and
    /// resolves the finished-vs-cancelled shutdown race in favour of
    /// whichever terminal write landed first.
    fn update_status(&self, job_id: &str, status: Status) -> Result<()>;

    fn job_status(&self, job_id: &str) -> Result<Option<Status>>;

    /// `(id, status)` pairs, most recently created first, at most `limit`.
    fn list_jobs(&self, limit: usize) -> Result<Vec<(String, Status)>>;

    /// Total number of recorded executions for the job.
    fn execution_count(&self, job_id: &str) -> Result<u32>;

    /// Execution history, most recent first, at most `limit` entries.
    fn execution_log(&self, job_id: &str, limit: usize) -> Result<Vec<Execution>>;

    /// Append one execution record. The log is append-only.
    fn add_execution(&self, job_id: &str, execution: Execution) -> Result<()>;
}
