//! One full lifecycle pass of the scheduler engine over the SQLite store.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use cronkeep::{ExecutorError, PayloadExecutor, Scheduler, SkippedPolicy, Status};
use cronkeep_sqlite::SqliteStore;

#[derive(Default)]
struct RecordingExecutor {
    calls: Mutex<Vec<Value>>,
}

#[async_trait]
impl PayloadExecutor for RecordingExecutor {
    async fn execute(&self, payload: Value) -> Result<Option<Value>, ExecutorError> {
        self.calls.lock().unwrap().push(payload);
        Ok(Some(json!("done")))
    }
}

async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    condition()
}

#[tokio::test]
async fn job_runs_to_completion_on_sqlite() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let executor = Arc::new(RecordingExecutor::default());
    let scheduler = Scheduler::new(store, executor.clone()).unwrap();

    let id = scheduler
        .create("* * * * * *", json!({"task": "ping"}), Some(2), SkippedPolicy::Ignore)
        .unwrap();

    let finished = wait_until(Duration::from_secs(10), || {
        scheduler.status(&id).unwrap() == Some(Status::Finished)
    })
    .await;
    assert!(finished);

    let log = scheduler.log(&id, 10).unwrap();
    assert_eq!(log.len(), 2);
    assert!(log
        .iter()
        .all(|e| e.result == Some(json!("done")) && e.error.is_none()));
    assert_eq!(executor.calls.lock().unwrap().len(), 2);

    assert_eq!(scheduler.list(10).unwrap(), vec![(id, Status::Finished)]);

    scheduler.close().await;
}
