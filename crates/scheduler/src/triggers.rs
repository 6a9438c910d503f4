// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recurrence triggers.
//!
//! A trigger computes the next fire instant strictly after a reference
//! instant. `IntervalTrigger` anchors to the previous deadline so the
//! cadence does not drift with execution time. `CronTrigger` implements
//! 6-field cron (second, minute, hour, day-of-month, month,
//! day-of-week) with wildcards, ranges, steps, and lists.

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("invalid cron field '{field}': {value:?}: {reason}")]
    InvalidField { field: &'static str, value: String, reason: String },

    #[error("interval must be positive")]
    NonPositiveInterval,
}

/// Computes successive fire instants for a repeating job.
pub trait Trigger: Send + Sync + fmt::Debug {
    /// Next fire instant strictly after `after`, or `None` when the
    /// schedule can never fire again (e.g. an unsatisfiable cron).
    fn next_run_time(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>>;
}

/// Fixed-interval recurrence: `next = max(after + every, start)`.
#[derive(Debug, Clone)]
pub struct IntervalTrigger {
    every: Duration,
    start: Option<DateTime<Utc>>,
}

impl IntervalTrigger {
    pub fn new(every: std::time::Duration, start: Option<DateTime<Utc>>) -> Result<Self, TriggerError> {
        let every = Duration::from_std(every).map_err(|_| TriggerError::NonPositiveInterval)?;
        if every <= Duration::zero() {
            return Err(TriggerError::NonPositiveInterval);
        }
        Ok(Self { every, start })
    }

    pub fn every(&self) -> Duration {
        self.every
    }
}

impl Trigger for IntervalTrigger {
    fn next_run_time(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.start {
            Some(start) if start > after => Some(start),
            _ => Some(after + self.every),
        }
    }
}

/// One parsed cron field: the set of allowed values in its range.
#[derive(Debug, Clone)]
struct CronField {
    /// True when the field was a bare `*` (no constraint). A stepped
    /// wildcard like `*/5` is restricted.
    any: bool,
    allowed: Vec<bool>,
    min: u32,
}

impl CronField {
    fn parse(field: &'static str, spec: &str, min: u32, max: u32) -> Result<Self, TriggerError> {
        let err = |reason: &str| TriggerError::InvalidField {
            field,
            value: spec.to_string(),
            reason: reason.to_string(),
        };

        let size = (max - min + 1) as usize;
        if spec == "*" {
            return Ok(Self { any: true, allowed: vec![true; size], min });
        }

        let mut allowed = vec![false; size];
        for part in spec.split(',') {
            let (range, step) = match part.split_once('/') {
                Some((range, step)) => {
                    let step: u32 =
                        step.parse().map_err(|_| err("step is not a number"))?;
                    if step == 0 {
                        return Err(err("step must be positive"));
                    }
                    (range, step)
                }
                None => (part, 1),
            };

            let (lo, hi) = if range == "*" {
                (min, max)
            } else if let Some((lo, hi)) = range.split_once('-') {
                let lo: u32 = lo.parse().map_err(|_| err("range start is not a number"))?;
                let hi: u32 = hi.parse().map_err(|_| err("range end is not a number"))?;
                if lo > hi {
                    return Err(err("range start exceeds range end"));
                }
                (lo, hi)
            } else {
                let v: u32 = range.parse().map_err(|_| err("value is not a number"))?;
                (v, v)
            };

            if lo < min || hi > max {
                return Err(err("value out of range"));
            }

            let mut v = lo;
            while v <= hi {
                allowed[(v - min) as usize] = true;
                v += step;
            }
        }

        Ok(Self { any: false, allowed, min })
    }

    fn matches(&self, value: u32) -> bool {
        self.allowed.get((value.saturating_sub(self.min)) as usize).copied().unwrap_or(false)
    }

    /// Restricted means anything other than a bare `*`.
    fn restricted(&self) -> bool {
        !self.any
    }
}

/// Arguments for a cron trigger, all fields as cron spec strings.
///
/// Defaults fire at second 0 of minute 0 of every hour.
#[derive(Debug, Clone)]
pub struct CronArgs {
    pub second: String,
    pub minute: String,
    pub hour: String,
    pub day_of_month: String,
    pub month: String,
    pub day_of_week: String,
    /// Earliest allowed fire instant.
    pub start: Option<DateTime<Utc>>,
}

impl Default for CronArgs {
    fn default() -> Self {
        Self {
            second: "0".to_string(),
            minute: "0".to_string(),
            hour: "*".to_string(),
            day_of_month: "*".to_string(),
            month: "*".to_string(),
            day_of_week: "*".to_string(),
            start: None,
        }
    }
}

/// 6-field cron trigger. Day-of-week runs Sunday=0 through Saturday=6
/// (7 also accepted as Sunday). When both day fields are restricted the
/// day matches if either does.
#[derive(Debug, Clone)]
pub struct CronTrigger {
    second: CronField,
    minute: CronField,
    hour: CronField,
    day_of_month: CronField,
    month: CronField,
    day_of_week: CronField,
    start: Option<DateTime<Utc>>,
}

// Upper bound on field-adjustment steps when searching for the next
// match; ~8 years of day jumps covers leap-year-only schedules.
const MAX_SEARCH_STEPS: u32 = 3100;

impl CronTrigger {
    pub fn from_args(args: CronArgs) -> Result<Self, TriggerError> {
        // parse day-of-week over 0..=7 and fold 7 (alias for Sunday)
        // into 0
        let mut day_of_week = CronField::parse("day_of_week", &args.day_of_week, 0, 7)?;
        if day_of_week.allowed.len() == 8 && day_of_week.allowed[7] {
            day_of_week.allowed[0] = true;
        }
        Ok(Self {
            second: CronField::parse("second", &args.second, 0, 59)?,
            minute: CronField::parse("minute", &args.minute, 0, 59)?,
            hour: CronField::parse("hour", &args.hour, 0, 23)?,
            day_of_month: CronField::parse("day_of_month", &args.day_of_month, 1, 31)?,
            month: CronField::parse("month", &args.month, 1, 12)?,
            day_of_week,
            start: args.start,
        })
    }

    fn day_matches(&self, t: DateTime<Utc>) -> bool {
        let dom = self.day_of_month.matches(t.day());
        let dow = self.day_of_week.matches(t.weekday().num_days_from_sunday());
        if self.day_of_month.restricted() && self.day_of_week.restricted() {
            dom || dow
        } else {
            dom && dow
        }
    }
}

impl Trigger for CronTrigger {
    fn next_run_time(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let floor = after.with_nanosecond(0)?;
        let mut t = floor + Duration::seconds(1);
        if let Some(start) = self.start {
            if start > t {
                t = start.with_nanosecond(0)?;
            }
        }

        for _ in 0..MAX_SEARCH_STEPS {
            if !self.month.matches(t.month()) {
                // first second of the next month
                let (year, month) = if t.month() == 12 { (t.year() + 1, 1) } else { (t.year(), t.month() + 1) };
                t = Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()?;
                continue;
            }
            if !self.day_matches(t) {
                let next_day = t.date_naive().succ_opt()?;
                t = Utc
                    .with_ymd_and_hms(next_day.year(), next_day.month(), next_day.day(), 0, 0, 0)
                    .single()?;
                continue;
            }
            if !self.hour.matches(t.hour()) {
                t = (t + Duration::hours(1)).with_minute(0)?.with_second(0)?;
                continue;
            }
            if !self.minute.matches(t.minute()) {
                t = (t + Duration::minutes(1)).with_second(0)?;
                continue;
            }
            if !self.second.matches(t.second()) {
                t += Duration::seconds(1);
                continue;
            }
            return Some(t);
        }

        None
    }
}

#[cfg(test)]
#[path = "triggers_tests.rs"]
mod tests;
