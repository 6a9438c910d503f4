// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scheduler's single sleep loop.
//!
//! Pops everything due, spawns a dispatch task per job, and otherwise
//! sleeps until either the next deadline or a wakeup kick (job added or
//! removed). The sleep is clamped: the minimum avoids hot-spinning on
//! imminent deadlines, the maximum bounds reaction latency if the clock
//! jumps.

use crate::error::RuntimeError;
use crate::resource::{Lifecycle, Resource, Service};
use crate::sink::EventSink;
use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use hassette_core::{Clock, HassetteConfig, ResourceRole};
use hassette_scheduler::{JobQueue, ScheduledJob};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, error, warn};

pub struct SchedulerService {
    resource: Resource,
    queue: Arc<JobQueue>,
    wakeup: Arc<Notify>,
    clock: Arc<dyn Clock>,
    min_delay: Duration,
    max_delay: Duration,
    default_delay: Duration,
}

impl SchedulerService {
    pub fn new(events: EventSink, clock: Arc<dyn Clock>, config: &HassetteConfig) -> Arc<Self> {
        Arc::new(Self {
            resource: Resource::new(
                "scheduler-service",
                ResourceRole::Service,
                events,
                config.task_cancellation_timeout(),
            ),
            queue: Arc::new(JobQueue::new()),
            wakeup: Arc::new(Notify::new()),
            clock,
            min_delay: config.scheduler_min_delay(),
            max_delay: config.scheduler_max_delay(),
            default_delay: config.scheduler_default_delay(),
        })
    }

    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Wake the loop so it re-evaluates the heap promptly.
    pub fn kick(&self) {
        self.wakeup.notify_one();
    }

    /// Scheduling facade scoped to `owner`.
    pub fn handle(&self, owner: impl Into<String>) -> super::SchedulerHandle {
        super::SchedulerHandle::new(
            owner,
            Arc::clone(&self.queue),
            Arc::clone(&self.wakeup),
            Arc::clone(&self.clock),
        )
    }

    async fn sleep(&self) {
        let delay = match self.queue.next_run_time().await {
            Some(next_run) => {
                let until = (next_run - self.clock.now())
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                until.clamp(self.min_delay, self.max_delay)
            }
            None => self.default_delay.min(self.max_delay),
        };

        debug!(?delay, "scheduler sleeping");
        tokio::select! {
            _ = self.resource.cancelled() => {}
            _ = self.wakeup.notified() => debug!("scheduler woke on kick"),
            _ = tokio::time::sleep(delay) => {}
        }
    }

    async fn dispatch_and_log(&self, job: Arc<ScheduledJob>) {
        if job.is_cancelled() {
            debug!(job = %job.job_id(), "job cancelled, skipping dispatch");
            return;
        }

        self.run_job(&job).await;
        self.reschedule_job(&job).await;
    }

    async fn run_job(&self, job: &Arc<ScheduledJob>) {
        let behind = self.clock.now() - job.next_run();
        if behind > ChronoDuration::seconds(1) {
            warn!(
                job = %job.job_id(),
                name = job.name(),
                behind_seconds = behind.num_seconds(),
                "job is behind schedule, running now"
            );
        }

        debug!(job = %job.job_id(), name = job.name(), "running job");
        if let Err(err) = job.run().await {
            error!(job = %job.job_id(), name = job.name(), error = %err, "job failed");
        }
    }

    async fn reschedule_job(&self, job: &Arc<ScheduledJob>) {
        if !job.repeat() || job.is_cancelled() {
            return;
        }
        let Some(trigger) = job.trigger() else {
            return;
        };

        let previous = job.next_run();
        match trigger.next_run_time(previous) {
            Some(next) if next > previous => {
                debug!(job = %job.job_id(), %next, "rescheduling repeating job");
                job.set_next_run(next);
                self.queue.add(Arc::clone(job)).await;
                self.kick();
            }
            Some(next) => {
                // a trigger that does not advance would busy-loop the
                // scheduler; drop the job instead
                error!(
                    job = %job.job_id(),
                    %previous,
                    %next,
                    "trigger did not advance next_run, dropping job"
                );
            }
            None => {
                warn!(job = %job.job_id(), "trigger exhausted, dropping job");
            }
        }
    }
}

#[async_trait]
impl Lifecycle for SchedulerService {
    fn resource(&self) -> &Resource {
        &self.resource
    }
}

#[async_trait]
impl Service for SchedulerService {
    async fn serve(self: Arc<Self>) -> Result<(), RuntimeError> {
        self.resource.mark_ready("scheduling");
        loop {
            if self.resource.shutdown_requested() {
                debug!("scheduler exiting");
                return Ok(());
            }

            let due = self.queue.pop_due(self.clock.now()).await;
            if !due.is_empty() {
                for job in due {
                    let service = Arc::clone(&self);
                    self.resource.tasks().spawn("scheduler:dispatch_job", async move {
                        service.dispatch_and_log(job).await;
                    });
                }
                continue;
            }

            self.sleep().await;
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
