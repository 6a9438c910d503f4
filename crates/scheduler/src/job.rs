// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduled job model.
//!
//! Ordering is strictly total: `(next_run floored to the second, the
//! unrounded sub-second nanos, job_id)`. The floor gives second
//! resolution for wake scheduling; the nanos and the monotonic job id
//! break ties deterministically.

use crate::triggers::Trigger;
use chrono::{DateTime, Timelike, Utc};
use futures_util::future::BoxFuture;
use hassette_core::{next_job_id, JobId};
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Error type surfaced by job callables. Failures are logged by the
/// dispatch loop and never unwind the scheduler.
pub type JobError = Box<dyn std::error::Error + Send + Sync + 'static>;

type JobClosure = dyn Fn() -> BoxFuture<'static, Result<(), JobError>> + Send + Sync;

/// A cloneable async job callable. Arguments are closure captures.
#[derive(Clone)]
pub struct JobFn(Arc<JobClosure>);

impl JobFn {
    pub fn new<F, Fut, E>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<JobError>,
    {
        let f = Arc::new(f);
        Self(Arc::new(move || {
            let f = Arc::clone(&f);
            Box::pin(async move { f().await.map_err(Into::into) })
        }))
    }

    pub async fn call(&self) -> Result<(), JobError> {
        (self.0)().await
    }
}

impl fmt::Debug for JobFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JobFn")
    }
}

/// Heap ordering key. Derived from `next_run` at push time so heap
/// entries stay immutable while the job itself is rescheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey {
    /// `next_run` floored to whole seconds (unix timestamp).
    pub due_secs: i64,
    /// Sub-second nanos of the unrounded instant, tiebreak only.
    pub nanos: u32,
    pub job_id: JobId,
}

/// A job scheduled to run at an instant, optionally recurring.
pub struct ScheduledJob {
    job_id: JobId,
    owner: String,
    name: String,
    job: JobFn,
    trigger: Option<Arc<dyn Trigger>>,
    repeat: bool,
    cancelled: AtomicBool,
    // (floored next_run, tiebreak nanos of the unrounded instant)
    next_run: Mutex<(DateTime<Utc>, u32)>,
}

impl ScheduledJob {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        next_run: DateTime<Utc>,
        job: JobFn,
        trigger: Option<Arc<dyn Trigger>>,
        repeat: bool,
    ) -> Arc<Self> {
        let this = Self {
            job_id: next_job_id(),
            owner: owner.into(),
            name: name.into(),
            job,
            trigger,
            repeat,
            cancelled: AtomicBool::new(false),
            next_run: Mutex::new((next_run, 0)),
        };
        this.set_next_run(next_run);
        Arc::new(this)
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn trigger(&self) -> Option<&Arc<dyn Trigger>> {
        self.trigger.as_ref()
    }

    /// Next run instant, floored to the second.
    pub fn next_run(&self) -> DateTime<Utc> {
        self.next_run.lock().0
    }

    /// Update the next run and refresh the ordering metadata.
    pub fn set_next_run(&self, next_run: DateTime<Utc>) {
        let nanos = next_run.nanosecond() % 1_000_000_000;
        let floored = next_run.with_nanosecond(0).unwrap_or(next_run);
        *self.next_run.lock() = (floored, nanos);
    }

    /// Ordering key for the heap, snapshotted at push time.
    pub fn sort_key(&self) -> SortKey {
        let (due, nanos) = *self.next_run.lock();
        SortKey { due_secs: due.timestamp(), nanos, job_id: self.job_id }
    }

    /// Mark the job cancelled; it is skipped at dispatch time even if
    /// the heap still holds it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub async fn run(&self) -> Result<(), JobError> {
        self.job.call().await
    }
}

impl fmt::Debug for ScheduledJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledJob")
            .field("job_id", &self.job_id)
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("next_run", &self.next_run())
            .field("repeat", &self.repeat)
            .finish()
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
