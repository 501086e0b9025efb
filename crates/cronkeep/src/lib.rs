//! `cronkeep` — persistent cron-based job scheduler on Tokio.
//!
//! # Overview
//!
//! Jobs are durable records behind the [`JobStore`] trait; the [`Scheduler`]
//! spawns one cooperative task per non-terminal job, which fires the payload
//! on its cron schedule, records every run, and survives process restarts by
//! resuming from whatever the store holds.
//!
//! # Skipped executions
//!
//! Fire times can elapse while no process is running. Each job carries a
//! [`SkippedPolicy`] deciding what happens on resume:
//!
//! | Policy       | Behaviour                                             |
//! |--------------|-------------------------------------------------------|
//! | `Ignore`     | Missed fires are dropped                              |
//! | `ExecuteOne` | All missed fires collapse into one catch-up run       |
//! | `ExecuteAll` | Every missed fire is replayed, up to `max_executions` |
//!
//! The SQLite adapter lives in the `cronkeep-sqlite` crate; [`MemoryStore`]
//! covers tests and schedulers that don't need to outlive the process.

pub mod engine;
pub mod error;
pub mod executor;
pub mod memory;
mod runner;
pub mod schedule;
pub mod store;
pub mod types;

pub use engine::Scheduler;
pub use error::{Result, SchedulerError};
pub use executor::{ExecutorError, PayloadExecutor};
pub use memory::MemoryStore;
pub use schedule::CronSchedule;
pub use store::JobStore;
pub use types::{Execution, Job, SkippedPolicy, Status};
