//! `cronkeep-sqlite` — rusqlite-backed [`JobStore`] for cronkeep.
//!
//! One `jobs` row per job, one append-only `executions` row per payload run.
//! Timestamps are RFC 3339 text, payloads and results JSON text; the adapter
//! owns all encoding. A single connection behind a mutex serializes access,
//! which also provides the per-row write ordering the scheduler relies on.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use uuid::Uuid;

use cronkeep::{
    CronSchedule, Execution, Job, JobStore, Result, SchedulerError, SkippedPolicy, Status,
};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and initialise the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path).map_err(db_err)?)
    }

    /// Fresh in-memory database. State is lost when the store is dropped.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory().map_err(db_err)?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Idempotent schema init: `jobs` keyed by id, `executions` keyed by an
/// auto-incrementing id and foreign-keyed to its job.
fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS jobs (
            id             TEXT    NOT NULL PRIMARY KEY,
            cron           TEXT    NOT NULL,
            payload        TEXT    NOT NULL,   -- JSON-encoded
            status         TEXT    NOT NULL DEFAULT 'created',
            max_executions INTEGER,            -- NULL means unbounded
            skipped        TEXT    NOT NULL,
            created_at     TEXT    NOT NULL    -- RFC 3339
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs (status);

        CREATE TABLE IF NOT EXISTS executions (
            id      INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id  TEXT NOT NULL REFERENCES jobs (id),
            ts      TEXT NOT NULL,             -- RFC 3339
            result  TEXT,                      -- JSON-encoded or NULL
            error   TEXT
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_executions_job_id ON executions (job_id);
        ",
    )
    .map_err(db_err)
}

fn db_err(e: rusqlite::Error) -> SchedulerError {
    SchedulerError::Storage(e.to_string())
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SchedulerError::Storage(format!("bad timestamp '{s}': {e}")))
}

type JobColumns = (
    String,         // id
    String,         // cron
    String,         // payload JSON
    String,         // status
    Option<u32>,    // max_executions
    String,         // skipped
    String,         // created_at
);

fn job_columns(row: &rusqlite::Row) -> rusqlite::Result<JobColumns> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn hydrate(columns: JobColumns) -> Result<Job> {
    let (id, cron, payload, status, max_executions, skipped, created_at) = columns;
    Ok(Job {
        id,
        schedule: CronSchedule::parse(&cron)?,
        payload: serde_json::from_str(&payload)?,
        status: status.parse().map_err(SchedulerError::Storage)?,
        max_executions,
        skipped: skipped.parse().map_err(SchedulerError::Storage)?,
        created_at: parse_ts(&created_at)?,
    })
}

impl JobStore for SqliteStore {
    fn create_job(
        &self,
        cron: &str,
        payload: Value,
        max_executions: Option<u32>,
        skipped: SkippedPolicy,
    ) -> Result<Job> {
        // Validate before touching the database so callers get InvalidCron
        // synchronously.
        let schedule = CronSchedule::parse(cron)?;
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let payload_json = serde_json::to_string(&payload)?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO jobs (id, cron, payload, status, max_executions, skipped, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                cron,
                payload_json,
                Status::Created.to_string(),
                max_executions,
                skipped.to_string(),
                created_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;

        Ok(Job {
            id,
            schedule,
            payload,
            status: Status::Created,
            max_executions,
            skipped,
            created_at,
        })
    }

    fn jobs_by_status(&self, statuses: &[Status]) -> Result<Vec<Job>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; statuses.len()].join(",");
        let sql = format!(
            "SELECT id, cron, payload, status, max_executions, skipped, created_at
             FROM jobs WHERE status IN ({placeholders})"
        );

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(
                rusqlite::params_from_iter(statuses.iter().map(|s| s.to_string())),
                job_columns,
            )
            .map_err(db_err)?;

        let mut jobs = Vec::new();
        for row in rows {
            jobs.push(hydrate(row.map_err(db_err)?)?);
        }
        Ok(jobs)
    }

    fn update_status(&self, job_id: &str, status: Status) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        // Terminal statuses are never overwritten; unknown ids update no rows.
        conn.execute(
            "UPDATE jobs SET status = ?1
             WHERE id = ?2 AND status NOT IN ('finished', 'cancelled')",
            params![status.to_string(), job_id],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn job_status(&self, job_id: &str) -> Result<Option<Status>> {
        let conn = self.conn.lock().unwrap();
        let status: Option<String> = conn
            .query_row("SELECT status FROM jobs WHERE id = ?1", [job_id], |row| {
                row.get(0)
            })
            .optional()
            .map_err(db_err)?;
        status
            .map(|s| s.parse().map_err(SchedulerError::Storage))
            .transpose()
    }

    fn list_jobs(&self, limit: usize) -> Result<Vec<(String, Status)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, status FROM jobs
                 ORDER BY created_at DESC, rowid DESC LIMIT ?1",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(db_err)?;

        let mut listed = Vec::new();
        for row in rows {
            let (id, status) = row.map_err(db_err)?;
            listed.push((id, status.parse().map_err(SchedulerError::Storage)?));
        }
        Ok(listed)
    }

    fn execution_count(&self, job_id: &str) -> Result<u32> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM executions WHERE job_id = ?1",
                [job_id],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count as u32)
    }

    fn execution_log(&self, job_id: &str, limit: usize) -> Result<Vec<Execution>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT ts, result, error FROM executions
                 WHERE job_id = ?1 ORDER BY ts DESC, id DESC LIMIT ?2",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![job_id, limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })
            .map_err(db_err)?;

        let mut log = Vec::new();
        for row in rows {
            let (ts, result, error) = row.map_err(db_err)?;
            log.push(Execution {
                timestamp: parse_ts(&ts)?,
                result: result.map(|r| serde_json::from_str(&r)).transpose()?,
                error,
            });
        }
        Ok(log)
    }

    fn add_execution(&self, job_id: &str, execution: Execution) -> Result<()> {
        let result_json = execution
            .result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO executions (job_id, ts, result, error) VALUES (?1, ?2, ?3, ?4)",
            params![
                job_id,
                execution.timestamp.to_rfc3339(),
                result_json,
                execution.error,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }
}
