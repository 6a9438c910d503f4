// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource framework: lifecycle state machine and supervision hooks.
//!
//! Every long-lived component embeds a [`Resource`] and implements
//! [`Lifecycle`] hooks. The terminal drivers [`initialize`] and
//! [`shutdown`] are free functions, not trait methods, so components
//! cannot override the transition discipline, only the `before`/`on`/
//! `after` hooks.
//!
//! Status transitions:
//! - `NotStarted -> Starting` when initialization begins
//! - `Starting -> Running` when the hooks return normally
//! - `Starting -> Failed` when a hook errors
//! - `Running -> Stopped` on shutdown (and after cleanup of a failure)
//! - `Running -> Crashed` when a service's `serve()` loop errors
//! - `Stopped`/`Failed`/`Crashed` `-> Starting` on restart
//!
//! Every transition emits a `service_status` event, best-effort: once
//! the event streams are closed the transition is only recorded locally.

use crate::error::RuntimeError;
use crate::sink::EventSink;
use crate::tasks::TaskBucket;
use async_trait::async_trait;
use hassette_core::{unique_name, Event, ResourceRole, ResourceStatus, ServiceStatusPayload};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct Resource {
    name: String,
    unique_name: String,
    role: ResourceRole,
    status: Mutex<(ResourceStatus, ResourceStatus)>,
    ready_tx: watch::Sender<bool>,
    ready_reason: Mutex<Option<String>>,
    // replaced with a fresh token when a stopped resource restarts
    shutdown: Mutex<CancellationToken>,
    tasks: TaskBucket,
    events: EventSink,
    initializing: AtomicBool,
    shutting_down: AtomicBool,
}

impl Resource {
    /// `name` is the stable component name carried in status events;
    /// the unique name appends a random short id.
    pub fn new(
        name: impl Into<String>,
        role: ResourceRole,
        events: EventSink,
        cancel_timeout: Duration,
    ) -> Self {
        let name = name.into();
        let unique = unique_name(&name);
        let (ready_tx, _) = watch::channel(false);
        Self {
            tasks: TaskBucket::new(unique.clone(), cancel_timeout),
            name,
            unique_name: unique,
            role,
            status: Mutex::new((ResourceStatus::NotStarted, ResourceStatus::NotStarted)),
            ready_tx,
            ready_reason: Mutex::new(None),
            shutdown: Mutex::new(CancellationToken::new()),
            events,
            initializing: AtomicBool::new(false),
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }

    pub fn role(&self) -> ResourceRole {
        self.role
    }

    pub fn status(&self) -> ResourceStatus {
        self.status.lock().0
    }

    pub fn previous_status(&self) -> ResourceStatus {
        self.status.lock().1
    }

    pub fn tasks(&self) -> &TaskBucket {
        &self.tasks
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    // --- readiness -----------------------------------------------------

    /// Readiness is orthogonal to status: a resource can be Running but
    /// not yet ready (e.g. the state proxy before its first sync).
    pub fn mark_ready(&self, reason: &str) {
        *self.ready_reason.lock() = Some(reason.to_string());
        self.ready_tx.send_replace(true);
    }

    pub fn mark_not_ready(&self, reason: &str) {
        *self.ready_reason.lock() = Some(reason.to_string());
        self.ready_tx.send_replace(false);
    }

    pub fn is_ready(&self) -> bool {
        *self.ready_tx.borrow()
    }

    pub fn ready_reason(&self) -> Option<String> {
        self.ready_reason.lock().clone()
    }

    /// Block until ready or timeout; cancellable like any future.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<(), RuntimeError> {
        let mut rx = self.ready_tx.subscribe();
        let result = tokio::time::timeout(timeout, rx.wait_for(|ready| *ready)).await;
        match result {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(RuntimeError::message(format!(
                "{} dropped its readiness channel",
                self.unique_name
            ))),
            Err(_) => Err(RuntimeError::Timeout(timeout)),
        }
    }

    // --- shutdown signal ----------------------------------------------

    /// Sticky shutdown request; clears readiness so callers back off.
    pub fn request_shutdown(&self, reason: &str) {
        let token = self.shutdown.lock().clone();
        if !token.is_cancelled() {
            debug!(resource = %self.unique_name, reason, "shutdown requested");
            token.cancel();
        }
        self.mark_not_ready(reason);
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.lock().is_cancelled()
    }

    /// Resolves when shutdown has been requested.
    pub async fn cancelled(&self) {
        let token = self.shutdown.lock().clone();
        token.cancelled().await
    }

    /// Token for wiring child cancellation (debounce timers and the
    /// like).
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.lock().clone()
    }

    /// A cancelled token cannot be un-cancelled; restart installs a
    /// fresh one.
    fn refresh_shutdown_token(&self) {
        let mut token = self.shutdown.lock();
        if token.is_cancelled() {
            *token = CancellationToken::new();
        }
    }

    // --- transitions ---------------------------------------------------

    fn set_status(&self, to: ResourceStatus) -> ResourceStatus {
        let mut status = self.status.lock();
        let previous = status.0;
        *status = (to, previous);
        previous
    }

    async fn emit_status(&self, status: ResourceStatus, previous: ResourceStatus, error: Option<String>) {
        if self.events.is_closed() {
            info!(
                resource = %self.unique_name,
                %status,
                "skipping status event, streams closed"
            );
            return;
        }
        self.events
            .send_best_effort(Event::service_status(ServiceStatusPayload {
                resource_name: self.name.clone(),
                role: self.role,
                status,
                previous_status: previous,
                error,
            }))
            .await;
    }

    pub async fn handle_starting(&self) {
        if self.status() == ResourceStatus::Starting {
            warn!(resource = %self.unique_name, "already starting");
            return;
        }
        info!(resource = %self.unique_name, role = %self.role, "starting");
        let previous = self.set_status(ResourceStatus::Starting);
        self.emit_status(ResourceStatus::Starting, previous, None).await;
    }

    pub async fn handle_running(&self) {
        if self.status() == ResourceStatus::Running {
            warn!(resource = %self.unique_name, "already running");
            return;
        }
        info!(resource = %self.unique_name, role = %self.role, "running");
        let previous = self.set_status(ResourceStatus::Running);
        self.emit_status(ResourceStatus::Running, previous, None).await;
    }

    pub async fn handle_stop(&self) {
        if self.status() == ResourceStatus::Stopped {
            warn!(resource = %self.unique_name, "already stopped");
            return;
        }
        info!(resource = %self.unique_name, role = %self.role, "stopping");
        let previous = self.set_status(ResourceStatus::Stopped);
        self.emit_status(ResourceStatus::Stopped, previous, None).await;
        self.mark_not_ready("stopped");
    }

    pub async fn handle_failed(&self, error: &RuntimeError) {
        if self.status() == ResourceStatus::Failed {
            warn!(resource = %self.unique_name, "already failed");
            return;
        }
        error!(resource = %self.unique_name, role = %self.role, %error, "failed");
        let previous = self.set_status(ResourceStatus::Failed);
        self.emit_status(ResourceStatus::Failed, previous, Some(error.to_string())).await;
        self.mark_not_ready("failed");
    }

    pub async fn handle_crash(&self, error: &RuntimeError) {
        if self.status() == ResourceStatus::Crashed {
            warn!(resource = %self.unique_name, "already crashed");
            return;
        }
        error!(resource = %self.unique_name, role = %self.role, %error, "crashed");
        let previous = self.set_status(ResourceStatus::Crashed);
        self.emit_status(ResourceStatus::Crashed, previous, Some(error.to_string())).await;
        self.mark_not_ready("crashed");
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("unique_name", &self.unique_name)
            .field("role", &self.role)
            .field("status", &self.status())
            .finish()
    }
}

/// Lifecycle hooks. Override what you own; the terminal drivers handle
/// transitions, failure capture, and task cleanup.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    fn resource(&self) -> &Resource;

    /// Prepare to accept new work: sockets, channels, subscriptions.
    async fn before_initialize(&self) -> Result<(), RuntimeError> {
        Ok(())
    }

    /// Primary initialization hook.
    async fn on_initialize(&self) -> Result<(), RuntimeError> {
        Ok(())
    }

    /// Finalize initialization, signal readiness.
    async fn after_initialize(&self) -> Result<(), RuntimeError> {
        Ok(())
    }

    /// Stop accepting new work.
    async fn before_shutdown(&self) -> Result<(), RuntimeError> {
        Ok(())
    }

    /// Release owned resources.
    async fn on_shutdown(&self) -> Result<(), RuntimeError> {
        Ok(())
    }

    /// Last-chance actions before cleanup and STOPPED.
    async fn after_shutdown(&self) -> Result<(), RuntimeError> {
        Ok(())
    }
}

/// A resource that additionally runs a continuous `serve()` loop, kept
/// alive by [`start_service`] and supervised by the service watcher.
#[async_trait]
pub trait Service: Lifecycle {
    /// Run until shutdown is requested or the stream ends. An error
    /// return is a crash.
    async fn serve(self: Arc<Self>) -> Result<(), RuntimeError>;
}

/// Clears the in-flight flag even when the initialize future is
/// dropped mid-hook (app startup timeouts cancel it).
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Terminal initialize driver. Idempotent: re-entering while already
/// initializing is a no-op.
pub async fn initialize<L: Lifecycle + ?Sized>(component: &L) -> Result<(), RuntimeError> {
    let resource = component.resource();
    if resource.initializing.swap(true, Ordering::SeqCst) {
        return Ok(());
    }
    let _guard = InFlightGuard(&resource.initializing);

    debug!(resource = %resource.unique_name, "initializing");
    resource.refresh_shutdown_token();
    resource.handle_starting().await;

    let result = async {
        component.before_initialize().await?;
        component.on_initialize().await?;
        component.after_initialize().await?;
        Ok(())
    }
    .await;

    match result {
        Ok(()) => {
            resource.handle_running().await;
            Ok(())
        }
        Err(e) => {
            resource.handle_failed(&e).await;
            Err(e)
        }
    }
}

/// Terminal shutdown driver. Idempotent; always cancels the task bucket
/// and emits STOPPED, even when a hook errors.
pub async fn shutdown<L: Lifecycle + ?Sized>(component: &L) {
    let resource = component.resource();
    if resource.shutting_down.swap(true, Ordering::SeqCst) {
        return;
    }
    resource.request_shutdown("shutdown");

    for (hook, result) in [
        ("before_shutdown", component.before_shutdown().await),
        ("on_shutdown", component.on_shutdown().await),
        ("after_shutdown", component.after_shutdown().await),
    ] {
        if let Err(error) = result {
            error!(resource = %resource.unique_name, hook, %error, "shutdown hook failed");
        }
    }

    resource.tasks.cancel_all().await;
    resource.handle_stop().await;
    resource.shutting_down.store(false, Ordering::SeqCst);
}

/// Initialize a service and spawn its supervised `serve()` loop.
///
/// A normal or cancelled return stops the service; an error crashes it,
/// which the service watcher escalates to a global shutdown.
pub async fn start_service<S>(service: &Arc<S>) -> Result<(), RuntimeError>
where
    S: Service + ?Sized + 'static,
{
    initialize(service.as_ref()).await?;

    let svc = Arc::clone(service);
    let name = format!("{}:serve", service.resource().name());
    service.resource().tasks().spawn(&name, async move {
        let result = Arc::clone(&svc).serve().await;
        let resource = svc.resource();
        match result {
            Ok(()) => {
                if resource.status() == ResourceStatus::Running {
                    resource.handle_stop().await;
                }
            }
            Err(error) => resource.handle_crash(&error).await,
        }
    });
    Ok(())
}

/// Restart a stopped/failed/crashed service: full shutdown, then a
/// fresh initialize + serve.
pub async fn restart_service<S>(service: &Arc<S>) -> Result<(), RuntimeError>
where
    S: Service + ?Sized + 'static,
{
    debug!(resource = %service.resource().unique_name(), "restarting");
    shutdown(service.as_ref()).await;
    start_service(service).await
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
