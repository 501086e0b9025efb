use thiserror::Error;

/// Errors that can occur within the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The cron expression does not parse. Surfaced synchronously to
    /// `create` callers.
    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },

    /// Underlying store I/O failure. Retried by the runner with a bounded
    /// backoff before the affected runner gives up.
    #[error("storage error: {0}")]
    Storage(String),

    /// Payload or result could not be encoded/decoded as JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
