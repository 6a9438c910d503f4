// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Min-heap of scheduled jobs behind a fair async lock.

use crate::job::{ScheduledJob, SortKey};
use chrono::{DateTime, Utc};
use hassette_core::JobId;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

struct HeapEntry {
    key: Reverse<SortKey>,
    job: Arc<ScheduledJob>,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

/// Heap of pending jobs keyed by `(next_run, nanos, job_id)`.
#[derive(Default)]
pub struct JobQueue {
    heap: Mutex<BinaryHeap<HeapEntry>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a job; its sort key is snapshotted from the current
    /// `next_run`.
    pub async fn add(&self, job: Arc<ScheduledJob>) {
        let mut heap = self.heap.lock().await;
        debug!(job = %job.job_id(), next_run = %job.next_run(), "queued job");
        heap.push(HeapEntry { key: Reverse(job.sort_key()), job });
    }

    /// Return and remove all jobs due at or before `now`, in order.
    pub async fn pop_due(&self, now: DateTime<Utc>) -> Vec<Arc<ScheduledJob>> {
        let mut due = Vec::new();
        let mut heap = self.heap.lock().await;
        while let Some(entry) = heap.peek() {
            if entry.job.next_run() > now {
                break;
            }
            if let Some(entry) = heap.pop() {
                due.push(entry.job);
            }
        }
        if !due.is_empty() {
            debug!(count = due.len(), "dequeued due jobs");
        }
        due
    }

    /// Next scheduled run instant, if any job is pending.
    pub async fn next_run_time(&self) -> Option<DateTime<Utc>> {
        let heap = self.heap.lock().await;
        heap.peek().map(|entry| entry.job.next_run())
    }

    /// Remove a specific job. Returns whether it was present.
    pub async fn remove_job(&self, job_id: JobId) -> bool {
        self.remove_where(|job| job.job_id() == job_id).await > 0
    }

    /// Remove all jobs belonging to `owner`. Returns how many went.
    pub async fn remove_owner(&self, owner: &str) -> usize {
        let removed = self.remove_where(|job| job.owner() == owner).await;
        if removed > 0 {
            debug!(owner, removed, "removed jobs for owner");
        }
        removed
    }

    /// Drop every pending job.
    pub async fn clear(&self) -> usize {
        let mut heap = self.heap.lock().await;
        let removed = heap.len();
        heap.clear();
        removed
    }

    pub async fn len(&self) -> usize {
        self.heap.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.heap.lock().await.is_empty()
    }

    async fn remove_where(&self, predicate: impl Fn(&ScheduledJob) -> bool) -> usize {
        let mut heap = self.heap.lock().await;
        let before = heap.len();
        let kept: BinaryHeap<HeapEntry> =
            heap.drain().filter(|entry| !predicate(&entry.job)).collect();
        *heap = kept;
        before - heap.len()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
