// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-resource task bucket.
//!
//! Tracks the in-flight tasks a resource has spawned so shutdown can
//! cancel them as a unit. Completed tasks remove their own entry; a
//! panic inside a task is caught and logged, never propagated.

use crate::error::RuntimeError;
use futures_util::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

struct TaskEntry {
    name: String,
    handle: JoinHandle<()>,
}

type TaskMap = Arc<Mutex<HashMap<u64, TaskEntry>>>;

/// A set of in-flight tasks owned by one resource.
#[derive(Clone)]
pub struct TaskBucket {
    name: Arc<str>,
    cancel_timeout: Duration,
    seq: Arc<AtomicU64>,
    tasks: TaskMap,
}

impl TaskBucket {
    pub fn new(name: impl Into<Arc<str>>, cancel_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            cancel_timeout,
            seq: Arc::new(AtomicU64::new(1)),
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Spawn a tracked task. Panics are caught and logged with the task
    /// name; the entry removes itself on completion.
    pub fn spawn<F>(&self, name: &str, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = self.seq.fetch_add(1, Ordering::Relaxed);
        let tasks = Arc::clone(&self.tasks);
        let bucket_name = Arc::clone(&self.name);
        let task_name = name.to_string();
        let monitored_name = task_name.clone();

        let handle = tokio::spawn(async move {
            if std::panic::AssertUnwindSafe(fut).catch_unwind().await.is_err() {
                error!(bucket = %bucket_name, task = %monitored_name, "task panicked");
            }
            tasks.lock().remove(&id);
        });

        let mut tasks = self.tasks.lock();
        // prune entries whose self-removal lost the race with insertion
        tasks.retain(|_, entry| !entry.handle.is_finished());
        if !handle.is_finished() {
            tasks.insert(id, TaskEntry { name: task_name, handle });
        }
    }

    /// Number of tracked (live) tasks.
    pub fn len(&self) -> usize {
        let mut tasks = self.tasks.lock();
        tasks.retain(|_, entry| !entry.handle.is_finished());
        tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancel every tracked task except the caller's own, wait up to the
    /// configured timeout for them to settle, and log stragglers.
    pub async fn cancel_all(&self) {
        let current = tokio::task::try_id();
        let entries: Vec<TaskEntry> = {
            let mut tasks = self.tasks.lock();
            let own_ids: Vec<u64> = tasks
                .iter()
                .filter(|(_, e)| current.is_some_and(|cur| e.handle.id() == cur))
                .map(|(id, _)| *id)
                .collect();
            let mut keep = HashMap::new();
            for id in own_ids {
                if let Some(entry) = tasks.remove(&id) {
                    keep.insert(id, entry);
                }
            }
            let drained = std::mem::take(&mut *tasks);
            *tasks = keep;
            drained.into_values().collect()
        };

        if entries.is_empty() {
            debug!(bucket = %self.name, "no tasks to cancel");
            return;
        }

        debug!(bucket = %self.name, count = entries.len(), "cancelling tasks");
        for entry in &entries {
            entry.handle.abort();
        }

        let deadline = tokio::time::Instant::now() + self.cancel_timeout;
        for entry in entries {
            match tokio::time::timeout_at(deadline, entry.handle).await {
                Ok(_) => {}
                Err(_) => {
                    warn!(
                        bucket = %self.name,
                        task = %entry.name,
                        timeout = ?self.cancel_timeout,
                        "task refused to die within the cancellation timeout"
                    );
                }
            }
        }
    }

    /// Run blocking work on the worker thread pool so it cannot stall
    /// the runtime threads.
    pub async fn run_blocking<F, T>(&self, f: F) -> Result<T, RuntimeError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| RuntimeError::message(format!("blocking task failed: {e}")))
    }

    /// Bridge an async call into a synchronous context with a timeout.
    ///
    /// Refuses to run on a runtime thread: blocking there would wedge
    /// the loop the future needs to make progress on.
    pub fn run_sync<F>(
        &self,
        handle: &tokio::runtime::Handle,
        fut: F,
        timeout: Duration,
    ) -> Result<F::Output, RuntimeError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(RuntimeError::message(
                "run_sync called from within the runtime; use the async form instead",
            ));
        }

        let (tx, rx) = std::sync::mpsc::channel();
        let join = handle.spawn(async move {
            let _ = tx.send(fut.await);
        });
        match rx.recv_timeout(timeout) {
            Ok(value) => Ok(value),
            Err(_) => {
                join.abort();
                Err(RuntimeError::Timeout(timeout))
            }
        }
    }
}

impl std::fmt::Debug for TaskBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskBucket").field("name", &self.name).field("tasks", &self.len()).finish()
    }
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
