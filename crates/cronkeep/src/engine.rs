//! Scheduler engine: owns the runner registry and the job lifecycle surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::Result;
use crate::executor::PayloadExecutor;
use crate::runner::JobRunner;
use crate::store::JobStore;
use crate::types::{Execution, Job, SkippedPolicy, Status};

/// Orchestrates one runner task per non-terminal job.
///
/// Construction performs restart recovery: every persisted job still in
/// `Created`, `Scheduled` or `Running` gets a fresh runner before `new`
/// returns. Runners coordinate only through the store, so blocking one job
/// never blocks another. Must be created inside a Tokio runtime.
pub struct Scheduler {
    store: Arc<dyn JobStore>,
    executor: Arc<dyn PayloadExecutor>,
    /// job id → cancellation signal for the matching runner.
    runners: Arc<DashMap<String, CancellationToken>>,
    /// Every runner ever spawned; drained and awaited by `close`.
    handles: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl Scheduler {
    pub fn new(store: Arc<dyn JobStore>, executor: Arc<dyn PayloadExecutor>) -> Result<Self> {
        let scheduler = Self {
            store: store.clone(),
            executor,
            runners: Arc::new(DashMap::new()),
            handles: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        };

        let recovered =
            store.jobs_by_status(&[Status::Created, Status::Scheduled, Status::Running])?;
        if !recovered.is_empty() {
            info!(count = recovered.len(), "resuming persisted jobs");
        }
        for job in recovered {
            scheduler.spawn_runner(job);
        }

        Ok(scheduler)
    }

    /// Persist a new job and start its runner.
    ///
    /// Fails synchronously with [`crate::SchedulerError::InvalidCron`] when
    /// the expression does not parse. After [`Scheduler::close`] the job is
    /// still persisted (status `Created`) but no runner starts, so it never
    /// advances.
    pub fn create(
        &self,
        cron: &str,
        payload: Value,
        max_executions: Option<u32>,
        skipped: SkippedPolicy,
    ) -> Result<String> {
        let job = self
            .store
            .create_job(cron, payload, max_executions, skipped)?;
        let id = job.id.clone();
        info!(job_id = %id, cron, "job created");
        self.spawn_runner(job);
        Ok(id)
    }

    /// Persist `Cancelled` and signal the runner to stop at its next
    /// suspension point. Idempotent on unknown or already-terminal jobs.
    pub fn cancel(&self, id: &str) -> Result<()> {
        self.store.update_status(id, Status::Cancelled)?;
        if let Some((_, token)) = self.runners.remove(id) {
            token.cancel();
            info!(job_id = %id, "job cancelled");
        }
        Ok(())
    }

    pub fn status(&self, id: &str) -> Result<Option<Status>> {
        self.store.job_status(id)
    }

    /// `(id, status)` pairs, most recently created first.
    pub fn list(&self, limit: usize) -> Result<Vec<(String, Status)>> {
        self.store.list_jobs(limit)
    }

    /// Execution history for one job, most recent first.
    pub fn log(&self, id: &str, limit: usize) -> Result<Vec<Execution>> {
        self.store.execution_log(id, limit)
    }

    /// Irreversible shutdown: signal every runner, then wait — with no
    /// timeout — until all previously spawned runners have stopped.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);

        for entry in self.runners.iter() {
            entry.value().cancel();
        }
        self.runners.clear();

        let handles: Vec<JoinHandle<()>> =
            std::mem::take(&mut *self.handles.lock().unwrap());
        let count = handles.len();
        for handle in handles {
            let _ = handle.await;
        }
        info!(runners = count, "scheduler closed");
    }

    fn spawn_runner(&self, job: Job) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }

        let token = CancellationToken::new();
        self.runners.insert(job.id.clone(), token.clone());

        let runner = JobRunner {
            job,
            store: self.store.clone(),
            executor: self.executor.clone(),
            registry: self.runners.clone(),
            token: token.clone(),
        };
        self.handles.lock().unwrap().push(tokio::spawn(runner.run()));

        // close() may have raced the spawn; make sure this runner stops too.
        if self.closed.load(Ordering::SeqCst) {
            token.cancel();
        }
    }
}
