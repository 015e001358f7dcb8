//! Parses the time expressions this scheduler accepts: six-field cron
//! (`second minute hour day-of-month month day-of-week`), plus the
//! `@daily`/`@hourly`/`@every <duration>` descriptor shortcuts. Five-field
//! expressions are explicitly rejected.

use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use taskrelay_protocols::error::SchedulerError;

#[derive(Clone)]
pub enum TimeSpec {
    Cron(Schedule),
    Every(Duration),
}

impl TimeSpec {
    pub fn parse(spec: &str) -> Result<Self, SchedulerError> {
        let trimmed = spec.trim();

        if let Some(duration_str) = trimmed.strip_prefix("@every ") {
            let duration = humantime::parse_duration(duration_str.trim()).map_err(|e| {
                SchedulerError::MalformedTimeSpec {
                    spec: spec.to_string(),
                    reason: format!("invalid @every duration: {e}"),
                }
            })?;
            return Ok(TimeSpec::Every(duration));
        }

        match trimmed {
            "@hourly" => return Self::parse_cron(spec, "0 0 * * * *"),
            "@daily" => return Self::parse_cron(spec, "0 0 0 * * *"),
            _ => {}
        }

        let field_count = trimmed.split_whitespace().count();
        if field_count == 5 {
            return Err(SchedulerError::MalformedTimeSpec {
                spec: spec.to_string(),
                reason: "five-field cron expressions are rejected; this scheduler requires the \
                         six-field form (second minute hour day-of-month month day-of-week)"
                    .to_string(),
            });
        }

        Self::parse_cron(spec, trimmed)
    }

    fn parse_cron(original: &str, expr: &str) -> Result<Self, SchedulerError> {
        let schedule: Schedule = expr.parse().map_err(|e| SchedulerError::MalformedTimeSpec {
            spec: original.to_string(),
            reason: format!("{e}"),
        })?;
        Ok(TimeSpec::Cron(schedule))
    }

    /// Next fire time strictly after `after`, or `None` for an `@every`
    /// spec (those are driven by a fixed-interval timer instead).
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeSpec::Cron(schedule) => schedule.after(&after).next(),
            TimeSpec::Every(_) => None,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        match self {
            TimeSpec::Every(duration) => Some(*duration),
            TimeSpec::Cron(_) => None,
        }
    }
}
