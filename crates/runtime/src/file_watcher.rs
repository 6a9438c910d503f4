// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File watcher service.
//!
//! Bridges `notify` filesystem events into the bus. The notify watcher
//! runs on its own thread; events cross into the runtime over a channel
//! and are coalesced within a short quiet window before being published
//! as `file_watcher` events, so one editor save does not trigger a
//! reload stampede.

use crate::error::RuntimeError;
use crate::resource::{Lifecycle, Resource, Service};
use crate::sink::EventSink;
use async_trait::async_trait;
use hassette_core::{Event, FileChangeKind, HassetteConfig, ResourceRole};
use notify::{EventKind, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const COALESCE_WINDOW: Duration = Duration::from_millis(150);

pub struct FileWatcherService {
    resource: Resource,
    sink: EventSink,
    paths: Vec<PathBuf>,
    // held so the notify thread stays alive while the service runs
    watcher: Mutex<Option<notify::RecommendedWatcher>>,
    rx: Mutex<Option<mpsc::Receiver<(FileChangeKind, Vec<PathBuf>)>>>,
}

impl FileWatcherService {
    pub fn new(events: EventSink, config: &HassetteConfig) -> Arc<Self> {
        Arc::new(Self {
            resource: Resource::new(
                "file-watcher",
                ResourceRole::Service,
                events.clone(),
                config.task_cancellation_timeout(),
            ),
            sink: events,
            paths: config.watchable_paths(),
            watcher: Mutex::new(None),
            rx: Mutex::new(None),
        })
    }

    fn change_kind(kind: &EventKind) -> Option<FileChangeKind> {
        match kind {
            EventKind::Create(_) => Some(FileChangeKind::Created),
            EventKind::Modify(_) => Some(FileChangeKind::Modified),
            EventKind::Remove(_) => Some(FileChangeKind::Removed),
            _ => None,
        }
    }
}

#[async_trait]
impl Lifecycle for FileWatcherService {
    fn resource(&self) -> &Resource {
        &self.resource
    }

    async fn on_initialize(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = mpsc::channel(64);

        let mut watcher = notify::recommended_watcher(
            move |result: Result<notify::Event, notify::Error>| match result {
                Ok(event) => {
                    if let Some(kind) = Self::change_kind(&event.kind) {
                        // blocking_send is fine: this runs on notify's
                        // own thread, never on the runtime
                        let _ = tx.blocking_send((kind, event.paths));
                    }
                }
                Err(error) => warn!(%error, "file watcher backend error"),
            },
        )
        .map_err(|e| RuntimeError::message(format!("failed to create file watcher: {e}")))?;

        for path in &self.paths {
            if let Err(error) = watcher.watch(path, RecursiveMode::Recursive) {
                // missing app dirs are common on fresh installs
                debug!(path = %path.display(), %error, "could not watch path");
            }
        }
        info!(paths = self.paths.len(), "watching for file changes");

        *self.watcher.lock() = Some(watcher);
        *self.rx.lock() = Some(rx);
        Ok(())
    }

    async fn on_shutdown(&self) -> Result<(), RuntimeError> {
        *self.watcher.lock() = None;
        Ok(())
    }
}

#[async_trait]
impl Service for FileWatcherService {
    async fn serve(self: Arc<Self>) -> Result<(), RuntimeError> {
        let mut rx = self
            .rx
            .lock()
            .take()
            .ok_or_else(|| RuntimeError::message("file watcher channel already consumed"))?;

        self.resource.mark_ready("watching");
        loop {
            let (kind, mut paths) = tokio::select! {
                _ = self.resource.cancelled() => return Ok(()),
                item = rx.recv() => match item {
                    Some(item) => item,
                    None => return Ok(()),
                }
            };

            // coalesce the burst that follows an editor save
            loop {
                match tokio::time::timeout(COALESCE_WINDOW, rx.recv()).await {
                    Ok(Some((_, more))) => paths.extend(more),
                    Ok(None) | Err(_) => break,
                }
            }
            paths.sort();
            paths.dedup();

            debug!(?kind, count = paths.len(), "publishing file change");
            self.sink.send_best_effort(Event::file_watcher(kind, paths)).await;
        }
    }
}
