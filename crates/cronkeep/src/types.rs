//! Shared data model: job records, execution history, and the status state
//! machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schedule::CronSchedule;

/// Lifecycle state of a job.
///
/// `Created → Scheduled → Running → Finished | Cancelled`. The runner alone
/// advances a job through `Scheduled` and `Running`; `Cancelled` may be
/// written externally from any non-terminal state. Terminal states never
/// transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Persisted, runner not yet past its first scheduling decision.
    Created,
    /// Next fire computed, waiting for it.
    Scheduled,
    /// Payload currently executing.
    Running,
    /// No next fire exists, or `max_executions` was reached.
    Finished,
    /// Stopped by external request.
    Cancelled,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Finished | Status::Cancelled)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Created => "created",
            Status::Scheduled => "scheduled",
            Status::Running => "running",
            Status::Finished => "finished",
            Status::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "created" => Ok(Status::Created),
            "scheduled" => Ok(Status::Scheduled),
            "running" => Ok(Status::Running),
            "finished" => Ok(Status::Finished),
            "cancelled" => Ok(Status::Cancelled),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// What to do about fire times that elapsed while no runner was active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkippedPolicy {
    /// Drop missed fires.
    Ignore,
    /// Collapse all missed fires into a single catch-up run.
    #[default]
    ExecuteOne,
    /// Replay every missed fire, subject to the execution budget.
    ExecuteAll,
}

impl std::fmt::Display for SkippedPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SkippedPolicy::Ignore => "ignore",
            SkippedPolicy::ExecuteOne => "execute_one",
            SkippedPolicy::ExecuteAll => "execute_all",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SkippedPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ignore" => Ok(SkippedPolicy::Ignore),
            "execute_one" => Ok(SkippedPolicy::ExecuteOne),
            "execute_all" => Ok(SkippedPolicy::ExecuteAll),
            other => Err(format!("unknown skipped policy: {other}")),
        }
    }
}

/// A persisted job record.
#[derive(Debug, Clone)]
pub struct Job {
    /// UUID v4 string, assigned by the store.
    pub id: String,
    /// Parsed cron schedule plus its source expression.
    pub schedule: CronSchedule,
    /// Opaque payload forwarded to the executor; adapters own its encoding.
    pub payload: Value,
    pub status: Status,
    /// When set, the job finishes after this many recorded executions.
    pub max_executions: Option<u32>,
    pub skipped: SkippedPolicy,
    pub created_at: DateTime<Utc>,
}

/// One recorded payload run. Append-only, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub timestamp: DateTime<Utc>,
    /// Executor output on success.
    pub result: Option<Value>,
    /// Failure text on error; mutually exclusive with `result`.
    pub error: Option<String>,
}

impl Execution {
    pub fn succeeded(result: Option<Value>) -> Self {
        Self {
            timestamp: Utc::now(),
            result,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            result: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_round_trips() {
        for status in [
            Status::Created,
            Status::Scheduled,
            Status::Running,
            Status::Finished,
            Status::Cancelled,
        ] {
            let parsed: Status = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("bogus".parse::<Status>().is_err());
    }

    #[test]
    fn only_finished_and_cancelled_are_terminal() {
        assert!(Status::Finished.is_terminal());
        assert!(Status::Cancelled.is_terminal());
        assert!(!Status::Created.is_terminal());
        assert!(!Status::Scheduled.is_terminal());
        assert!(!Status::Running.is_terminal());
    }

    #[test]
    fn skipped_policy_round_trips() {
        for policy in [
            SkippedPolicy::Ignore,
            SkippedPolicy::ExecuteOne,
            SkippedPolicy::ExecuteAll,
        ] {
            let parsed: SkippedPolicy = policy.to_string().parse().unwrap();
            assert_eq!(parsed, policy);
        }
        assert_eq!(SkippedPolicy::default(), SkippedPolicy::ExecuteOne);
    }

    #[test]
    fn status_serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&Status::Scheduled).unwrap(),
            "\"scheduled\""
        );
        assert_eq!(
            serde_json::to_string(&SkippedPolicy::ExecuteAll).unwrap(),
            "\"execute_all\""
        );
    }

    #[test]
    fn execution_constructors_are_mutually_exclusive() {
        let ok = Execution::succeeded(Some(serde_json::json!(42)));
        assert!(ok.error.is_none());
        assert_eq!(ok.result, Some(serde_json::json!(42)));

        let err = Execution::failed("boom");
        assert!(err.result.is_none());
        assert_eq!(err.error.as_deref(), Some("boom"));
    }
}
