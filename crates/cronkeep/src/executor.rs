//! The payload-execution seam.

use async_trait::async_trait;
use serde_json::Value;

/// Failure raised by a payload executor. Recorded on the execution row as
/// display text, never propagated to the runner or engine.
pub type ExecutorError = Box<dyn std::error::Error + Send + Sync>;

/// Executes one job's payload.
///
/// Implementations own any timeout or retry behaviour — the scheduler
/// imposes none, and an in-flight call cannot be preempted. Every failure is
/// treated as data: it becomes the `error` field of an [`crate::Execution`]
/// and the schedule keeps going.
#[async_trait]
pub trait PayloadExecutor: Send + Sync {
    async fn execute(&self, payload: Value) -> std::result::Result<Option<Value>, ExecutorError>;
}
