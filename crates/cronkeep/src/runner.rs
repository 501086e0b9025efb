//! Per-job control loop. One spawned task per non-terminal job.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::executor::PayloadExecutor;
use crate::store::JobStore;
use crate::types::{Execution, Job, SkippedPolicy, Status};

/// Store calls are retried this many times before the runner gives up.
const STORE_ATTEMPTS: u32 = 3;
const STORE_RETRY_DELAY: Duration = Duration::from_millis(200);

pub(crate) struct JobRunner {
    pub(crate) job: Job,
    pub(crate) store: Arc<dyn JobStore>,
    pub(crate) executor: Arc<dyn PayloadExecutor>,
    /// Shared engine registry; the runner removes its own entry on exit.
    pub(crate) registry: Arc<DashMap<String, CancellationToken>>,
    pub(crate) token: CancellationToken,
}

impl JobRunner {
    pub(crate) async fn run(self) {
        if let Err(e) = self.drive().await {
            error!(
                job_id = %self.job.id,
                error = %e,
                "runner stopped after repeated storage failures"
            );
        }
        // Already gone when cancel() or close() removed the entry first.
        self.registry.remove(&self.job.id);
    }

    async fn drive(&self) -> Result<()> {
        self.recover_skipped().await?;

        let mut executions = self
            .with_retry("count executions", || {
                self.store.execution_count(&self.job.id)
            })
            .await?;

        loop {
            if self.token.is_cancelled() {
                return Ok(());
            }

            // Loop-entry check so a catch-up that saturated the budget
            // finishes without one extra natural fire.
            if self.job.max_executions.is_some_and(|max| executions >= max) {
                return self.transition(Status::Finished).await;
            }

            let Some(delay) = self.job.schedule.time_to_next(Utc::now()) else {
                return self.transition(Status::Finished).await;
            };

            self.transition(Status::Scheduled).await?;

            tokio::select! {
                _ = self.token.cancelled() => return Ok(()),
                _ = tokio::time::sleep(delay) => {}
            }

            self.execute_once().await?;
            executions += 1;
        }
    }

    /// Decide what to do about fire times that elapsed while no runner was
    /// active, e.g. across a deploy:
    ///
    /// ```text
    /// t1 - t2 - [ t3 - t4 - t5 ] - t6 - t7
    ///           [--process down--]
    /// ```
    ///
    /// Depending on the policy, t3..t5 are dropped, collapsed into one
    /// catch-up run, or replayed in full. Catch-ups never push the recorded
    /// execution count past `max_executions`.
    async fn recover_skipped(&self) -> Result<()> {
        if self.job.skipped == SkippedPolicy::Ignore {
            return Ok(());
        }

        let last = self
            .with_retry("read execution log", || {
                self.store.execution_log(&self.job.id, 1)
            })
            .await?
            .first()
            .map(|e| e.timestamp)
            .unwrap_or(self.job.created_at);

        let skipped = self.job.schedule.fires_between(last, Utc::now());
        if skipped == 0 {
            return Ok(());
        }

        let to_run = if self.job.skipped == SkippedPolicy::ExecuteOne {
            1
        } else {
            skipped
        };
        let to_run = match self.job.max_executions {
            Some(max) => {
                let recorded = self
                    .with_retry("count executions", || {
                        self.store.execution_count(&self.job.id)
                    })
                    .await?;
                to_run.min(max.saturating_sub(recorded))
            }
            None => to_run,
        };

        if to_run == 0 {
            return Ok(());
        }
        info!(job_id = %self.job.id, count = to_run, "running catch-up executions");

        for _ in 0..to_run {
            if self.token.is_cancelled() {
                return Ok(());
            }
            self.execute_once().await?;
        }
        Ok(())
    }

    /// Run the payload once and record the outcome. Executor failures are
    /// data, not control flow: they land in the execution's `error` field.
    async fn execute_once(&self) -> Result<()> {
        self.transition(Status::Running).await?;
        info!(job_id = %self.job.id, "executing job");

        let execution = match self.executor.execute(self.job.payload.clone()).await {
            Ok(result) => Execution::succeeded(result),
            Err(e) => Execution::failed(e.to_string()),
        };

        self.with_retry("append execution", || {
            self.store.add_execution(&self.job.id, execution.clone())
        })
        .await
    }

    async fn transition(&self, status: Status) -> Result<()> {
        self.with_retry("update status", || {
            self.store.update_status(&self.job.id, status)
        })
        .await
    }

    /// Bounded retry for store calls; the final error aborts the runner
    /// (logged in `run`) rather than dying silently.
    async fn with_retry<T>(&self, what: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if attempt < STORE_ATTEMPTS => {
                    warn!(
                        job_id = %self.job.id,
                        attempt,
                        error = %e,
                        "{what} failed, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(STORE_RETRY_DELAY).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
