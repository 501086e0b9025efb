//! Thin wrapper around the `cron` crate: the two evaluation questions the
//! runner asks, and nothing else.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{Result, SchedulerError};

/// Parsed cron expression plus its source text.
///
/// Expressions use the seconds-resolution format of the `cron` crate
/// (`sec min hour day-of-month month day-of-week [year]`), so
/// `"* * * * * *"` fires every second.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    inner: cron::Schedule,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self> {
        let inner =
            cron::Schedule::from_str(expression).map_err(|e| SchedulerError::InvalidCron {
                expr: expression.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            expression: expression.to_string(),
            inner,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Time until the next fire strictly after `from`, or `None` when the
    /// schedule is exhausted (e.g. a fixed-year expression in the past).
    pub fn time_to_next(&self, from: DateTime<Utc>) -> Option<Duration> {
        let next = self.inner.after(&from).next()?;
        (next - from).to_std().ok()
    }

    /// Number of fire times strictly between `after` and `before`.
    pub fn fires_between(&self, after: DateTime<Utc>, before: DateTime<Utc>) -> u32 {
        self.inner
            .after(&after)
            .take_while(|t| *t < before)
            .count() as u32
    }
}

impl PartialEq for CronSchedule {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression
    }
}

impl Eq for CronSchedule {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, s).unwrap()
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = CronSchedule::parse("definitely not cron").unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidCron { .. }));
    }

    #[test]
    fn every_second_fires_within_a_second() {
        let schedule = CronSchedule::parse("* * * * * *").unwrap();
        let delay = schedule.time_to_next(Utc::now()).unwrap();
        assert!(delay <= Duration::from_secs(1));
    }

    #[test]
    fn exhausted_schedule_has_no_next_fire() {
        // Fixed year in the past: fires once on 2015-01-01, never again.
        let schedule = CronSchedule::parse("0 0 0 1 1 * 2015").unwrap();
        assert_eq!(schedule.time_to_next(at(0, 0, 0)), None);
    }

    #[test]
    fn fires_between_counts_strictly_inside_the_window() {
        let schedule = CronSchedule::parse("* * * * * *").unwrap();
        // Fires at :01, :02, :03, :04 — the endpoints are excluded.
        assert_eq!(schedule.fires_between(at(0, 0, 0), at(0, 0, 5)), 4);
        assert_eq!(schedule.fires_between(at(0, 0, 5), at(0, 0, 5)), 0);
        assert_eq!(schedule.fires_between(at(0, 0, 5), at(0, 0, 0)), 0);
    }

    #[test]
    fn hourly_schedule_counts_whole_hours() {
        let schedule = CronSchedule::parse("0 0 * * * *").unwrap();
        assert_eq!(schedule.fires_between(at(0, 30, 0), at(2, 30, 0)), 2);
    }
}
