// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service watcher: supervised restart with exponential backoff.
//!
//! Observes `service_status` events. A FAILED resource is restarted
//! with `base * multiplier^attempts` backoff, capped, up to a maximum
//! attempt count. A CRASHED resource takes the whole process down.

use crate::bus::{BusHandle, SubscribeOptions};
use crate::error::RuntimeError;
use crate::resource::{restart_service, Lifecycle, Resource, Service};
use crate::sink::EventSink;
use async_trait::async_trait;
use hassette_bus::Handler;
use hassette_core::{Event, HassetteConfig, ResourceRole, ServiceStatusPayload};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct ServiceWatcher {
    resource: Resource,
    /// Restart targets registered by the orchestrator.
    targets: Mutex<Vec<Arc<dyn Service>>>,
    restart_attempts: Mutex<HashMap<String, u32>>,
    /// Global shutdown trigger for crash escalation.
    global_shutdown: CancellationToken,

    max_attempts: u32,
    backoff: Duration,
    multiplier: f64,
    max_backoff: Duration,
}

impl ServiceWatcher {
    pub fn new(
        events: EventSink,
        global_shutdown: CancellationToken,
        config: &HassetteConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            resource: Resource::new(
                "service-watcher",
                ResourceRole::Resource,
                events,
                config.task_cancellation_timeout(),
            ),
            targets: Mutex::new(Vec::new()),
            restart_attempts: Mutex::new(HashMap::new()),
            global_shutdown,
            max_attempts: config.service_restart_max_attempts,
            backoff: config.service_restart_backoff(),
            multiplier: config.service_restart_backoff_multiplier,
            max_backoff: config.service_restart_max_backoff(),
        })
    }

    pub fn register_target(&self, service: Arc<dyn Service>) {
        self.targets.lock().push(service);
    }

    fn service_key(payload: &ServiceStatusPayload) -> String {
        format!("{}:{}", payload.resource_name, payload.role)
    }

    /// Backoff for the given (0-based) attempt, capped.
    fn backoff_for(&self, attempts: u32) -> Duration {
        let scaled = self.backoff.as_secs_f64() * self.multiplier.powi(attempts as i32);
        Duration::from_secs_f64(scaled.min(self.max_backoff.as_secs_f64()))
    }

    async fn restart_failed(self: Arc<Self>, payload: ServiceStatusPayload) {
        let key = Self::service_key(&payload);
        let attempts = self.restart_attempts.lock().get(&key).copied().unwrap_or(0);

        if attempts >= self.max_attempts {
            error!(
                resource = %payload.resource_name,
                attempts,
                max = self.max_attempts,
                "resource failed too many times, not restarting"
            );
            return;
        }

        // count the attempt before restarting: the serve task fails
        // asynchronously, so restart() returns before a new failure can
        // be observed
        self.restart_attempts.lock().insert(key, attempts + 1);

        let backoff = self.backoff_for(attempts);
        if !backoff.is_zero() {
            info!(
                resource = %payload.resource_name,
                attempt = attempts + 1,
                max = self.max_attempts,
                ?backoff,
                "waiting before restart"
            );
            tokio::time::sleep(backoff).await;
        }

        let targets: Vec<Arc<dyn Service>> = self
            .targets
            .lock()
            .iter()
            .filter(|t| {
                t.resource().name() == payload.resource_name
                    && t.resource().role() == payload.role
            })
            .cloned()
            .collect();

        if targets.is_empty() {
            warn!(resource = %payload.resource_name, "no restart target found, skipping");
            return;
        }
        if targets.len() > 1 {
            warn!(resource = %payload.resource_name, "multiple restart targets, restarting all");
        }

        for target in targets {
            if let Err(e) = restart_service(&target).await {
                error!(resource = %payload.resource_name, error = %e, "restart failed");
            }
        }
    }

    fn shutdown_on_crash(&self, payload: &ServiceStatusPayload) {
        error!(
            resource = %payload.resource_name,
            role = %payload.role,
            error = payload.error.as_deref().unwrap_or("unknown"),
            "resource crashed, shutting down"
        );
        self.global_shutdown.cancel();
    }

    fn log_transition(payload: &ServiceStatusPayload) {
        if payload.status == payload.previous_status {
            return;
        }
        debug!(
            resource = %payload.resource_name,
            role = %payload.role,
            from = %payload.previous_status,
            to = %payload.status,
            "resource transition"
        );
    }

    /// Wire the status subscriptions.
    pub async fn attach(self: &Arc<Self>, bus: &BusHandle) -> Result<(), RuntimeError> {
        let watcher = Arc::clone(self);
        bus.on_service_failed(
            Handler::new("service-watcher:restart", move |event: Arc<Event>| {
                let watcher = Arc::clone(&watcher);
                async move {
                    if let Some(payload) = event.as_service_status() {
                        watcher.restart_failed(payload.clone()).await;
                    }
                    Ok::<_, std::convert::Infallible>(())
                }
            }),
            SubscribeOptions::default(),
        )
        .await?;

        let watcher = Arc::clone(self);
        bus.on_service_crashed(
            Handler::new("service-watcher:crash", move |event: Arc<Event>| {
                let watcher = Arc::clone(&watcher);
                async move {
                    if let Some(payload) = event.as_service_status() {
                        watcher.shutdown_on_crash(payload);
                    }
                    Ok::<_, std::convert::Infallible>(())
                }
            }),
            SubscribeOptions::default(),
        )
        .await?;

        bus.on_service_status(
            None,
            Handler::new("service-watcher:log", move |event: Arc<Event>| async move {
                if let Some(payload) = event.as_service_status() {
                    Self::log_transition(payload);
                }
                Ok::<_, std::convert::Infallible>(())
            }),
            SubscribeOptions::default(),
        )
        .await?;

        Ok(())
    }

    #[cfg(test)]
    fn attempts_for(&self, name: &str, role: ResourceRole) -> u32 {
        self.restart_attempts.lock().get(&format!("{name}:{role}")).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Lifecycle for ServiceWatcher {
    fn resource(&self) -> &Resource {
        &self.resource
    }

    async fn after_initialize(&self) -> Result<(), RuntimeError> {
        self.resource.mark_ready("watching");
        Ok(())
    }
}

#[cfg(test)]
#[path = "service_watcher_tests.rs"]
mod tests;
