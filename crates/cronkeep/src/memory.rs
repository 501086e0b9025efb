//! In-process [`JobStore`] backed by a mutex-guarded table.
//!
//! Useful for tests and for schedulers that don't need to survive restarts.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;
use crate::schedule::CronSchedule;
use crate::store::JobStore;
use crate::types::{Execution, Job, SkippedPolicy, Status};

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Insertion order doubles as creation order for `list_jobs`.
    jobs: Vec<Job>,
    executions: HashMap<String, Vec<Execution>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for MemoryStore {
    fn create_job(
        &self,
        cron: &str,
        payload: Value,
        max_executions: Option<u32>,
        skipped: SkippedPolicy,
    ) -> Result<Job> {
        let schedule = CronSchedule::parse(cron)?;
        let job = Job {
            id: Uuid::new_v4().to_string(),
            schedule,
            payload,
            status: Status::Created,
            max_executions,
            skipped,
            created_at: Utc::now(),
        };
        self.inner.lock().unwrap().jobs.push(job.clone());
        Ok(job)
    }

    fn jobs_by_status(&self, statuses: &[Status]) -> Result<Vec<Job>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .jobs
            .iter()
            .filter(|j| statuses.contains(&j.status))
            .cloned()
            .collect())
    }

    fn update_status(&self, job_id: &str, status: Status) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(job) = inner.jobs.iter_mut().find(|j| j.id == job_id) {
            if !job.status.is_terminal() {
                job.status = status;
            }
        }
        Ok(())
    }

    fn job_status(&self, job_id: &str) -> Result<Option<Status>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.jobs.iter().find(|j| j.id == job_id).map(|j| j.status))
    }

    fn list_jobs(&self, limit: usize) -> Result<Vec<(String, Status)>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .jobs
            .iter()
            .rev()
            .take(limit)
            .map(|j| (j.id.clone(), j.status))
            .collect())
    }

    fn execution_count(&self, job_id: &str) -> Result<u32> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.executions.get(job_id).map_or(0, |v| v.len() as u32))
    }

    fn execution_log(&self, job_id: &str, limit: usize) -> Result<Vec<Execution>> {
        let inner = self.inner.lock().unwrap();
        let mut log: Vec<Execution> = inner.executions.get(job_id).cloned().unwrap_or_default();
        log.sort_by_key(|e| e.timestamp);
        Ok(log.into_iter().rev().take(limit).collect())
    }

    fn add_execution(&self, job_id: &str, execution: Execution) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .executions
            .entry(job_id.to_string())
            .or_default()
            .push(execution);
        Ok(())
    }
}
