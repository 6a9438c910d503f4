// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-owner scheduling facade.
//!
//! Every job created through a handle is tagged with the handle's
//! owner so `remove_all_jobs` can sweep an app's jobs in one call.
//! Adding or removing a job kicks the service loop awake.

use crate::error::RuntimeError;
use chrono::{DateTime, Utc};
use hassette_core::Clock;
use hassette_scheduler::{
    CronArgs, CronTrigger, IntervalTrigger, JobFn, JobQueue, ScheduledJob, Trigger,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Clone)]
pub struct SchedulerHandle {
    owner: String,
    queue: Arc<JobQueue>,
    wakeup: Arc<Notify>,
    clock: Arc<dyn Clock>,
}

impl SchedulerHandle {
    pub(crate) fn new(
        owner: impl Into<String>,
        queue: Arc<JobQueue>,
        wakeup: Arc<Notify>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { owner: owner.into(), queue, wakeup, clock }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    fn kick(&self) {
        self.wakeup.notify_one();
    }

    /// Push a pre-built job and wake the scheduler.
    pub async fn add_job(&self, job: Arc<ScheduledJob>) -> Arc<ScheduledJob> {
        self.queue.add(Arc::clone(&job)).await;
        self.kick();
        job
    }

    /// Schedule a callable at an absolute instant, optionally
    /// repeating via a trigger.
    pub async fn schedule(
        &self,
        func: JobFn,
        run_at: DateTime<Utc>,
        trigger: Option<Arc<dyn Trigger>>,
        repeat: bool,
        name: &str,
    ) -> Arc<ScheduledJob> {
        let job = ScheduledJob::new(self.owner.clone(), name, run_at, func, trigger, repeat);
        self.add_job(job).await
    }

    /// One-shot at an absolute instant.
    pub async fn run_once(
        &self,
        func: JobFn,
        run_at: DateTime<Utc>,
        name: &str,
    ) -> Arc<ScheduledJob> {
        self.schedule(func, run_at, None, false, name).await
    }

    /// One-shot after a delay.
    pub async fn run_in(
        &self,
        func: JobFn,
        delay: Duration,
        name: &str,
    ) -> Result<Arc<ScheduledJob>, RuntimeError> {
        let delay = chrono::Duration::from_std(delay)
            .map_err(|_| RuntimeError::Config("delay out of range".to_string()))?;
        Ok(self.run_once(func, self.clock.now() + delay, name).await)
    }

    /// Repeating job on a fixed interval. First run at `start` when
    /// given, otherwise one interval from now.
    pub async fn run_every(
        &self,
        func: JobFn,
        every: Duration,
        start: Option<DateTime<Utc>>,
        name: &str,
    ) -> Result<Arc<ScheduledJob>, RuntimeError> {
        let trigger = IntervalTrigger::new(every, start)?;
        let first_run = match start {
            Some(start) => start,
            None => {
                let every = chrono::Duration::from_std(every)
                    .map_err(|_| RuntimeError::Config("interval out of range".to_string()))?;
                self.clock.now() + every
            }
        };
        Ok(self.schedule(func, first_run, Some(Arc::new(trigger)), true, name).await)
    }

    /// Repeating job on a 6-field cron schedule.
    pub async fn run_cron(
        &self,
        func: JobFn,
        args: CronArgs,
        name: &str,
    ) -> Result<Arc<ScheduledJob>, RuntimeError> {
        let trigger = CronTrigger::from_args(args)?;
        let first_run = trigger.next_run_time(self.clock.now()).ok_or_else(|| {
            RuntimeError::Config(format!("cron schedule for job '{name}' can never fire"))
        })?;
        Ok(self.schedule(func, first_run, Some(Arc::new(trigger)), true, name).await)
    }

    /// Remove a job from the queue and mark it cancelled so an
    /// already-dispatched run does not reschedule it.
    pub async fn remove_job(&self, job: &ScheduledJob) -> bool {
        job.cancel();
        let removed = self.queue.remove_job(job.job_id()).await;
        if removed {
            self.kick();
        }
        removed
    }

    /// Sweep every job owned by this handle's owner.
    pub async fn remove_all_jobs(&self) -> usize {
        let removed = self.queue.remove_owner(&self.owner).await;
        if removed > 0 {
            self.kick();
        }
        removed
    }
}

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
