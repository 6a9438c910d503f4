// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The central dispatch loop.
//!
//! Single consumer of the ingress channel. For every event it gathers
//! the matching listeners under the router's read lock, then runs each
//! listener in its own task so a slow or failing handler cannot block
//! the loop or its peers. State-change events are applied to the state
//! proxy before any listener sees them, so observers always read a
//! cache at least as new as the event they are handling.

use crate::bus::handle::BusHandle;
use crate::error::RuntimeError;
use crate::resource::{Lifecycle, Resource, Service};
use crate::sink::EventSink;
use crate::state::StateProxy;
use async_trait::async_trait;
use hassette_bus::{Listener, Router};
use hassette_core::{Event, HassetteConfig, ResourceRole};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, trace};

pub struct BusService {
    resource: Resource,
    router: Arc<Router>,
    ingress: Mutex<Option<mpsc::Receiver<Arc<Event>>>>,
    state_proxy: Mutex<Option<Arc<StateProxy>>>,
    drop_noisy_system_log_events: bool,
}

impl BusService {
    pub fn new(
        events: EventSink,
        ingress: mpsc::Receiver<Arc<Event>>,
        router: Arc<Router>,
        config: &HassetteConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            resource: Resource::new(
                "bus-service",
                ResourceRole::Service,
                events,
                config.task_cancellation_timeout(),
            ),
            router,
            ingress: Mutex::new(Some(ingress)),
            state_proxy: Mutex::new(None),
            drop_noisy_system_log_events: config.drop_noisy_system_log_events,
        })
    }

    /// Install the state proxy that receives state changes ahead of
    /// listener dispatch.
    pub fn set_state_proxy(&self, proxy: Arc<StateProxy>) {
        *self.state_proxy.lock() = Some(proxy);
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Subscription facade scoped to `owner`.
    pub fn handle(&self, owner: impl Into<String>) -> BusHandle {
        BusHandle::new(owner, Arc::clone(&self.router), self.resource.shutdown_token())
    }

    /// Intentional policy: Home Assistant logs `system_log` service
    /// calls at debug level constantly; they drown everything else.
    fn is_noisy(&self, event: &Event) -> bool {
        if !self.drop_noisy_system_log_events {
            return false;
        }
        let Some(call) = event.as_call_service() else {
            return false;
        };
        call.domain == "system_log"
            && call.service_data.get("level").and_then(|v| v.as_str()) == Some("debug")
    }

    async fn dispatch(&self, event: Arc<Event>) {
        if self.is_noisy(&event) {
            return;
        }

        // state proxy sees state changes before any listener
        if let Some(payload) = event.as_state_changed() {
            let proxy = self.state_proxy.lock().clone();
            if let Some(proxy) = proxy {
                proxy.apply_state_change(payload).await;
            }
        }

        let targets = self.router.get_matching_listeners(event.topic()).await;
        trace!(topic = event.topic(), listeners = targets.len(), "dispatching");

        for listener in targets {
            let router = Arc::clone(&self.router);
            let event = Arc::clone(&event);
            self.resource.tasks().spawn("bus:dispatch_listener", async move {
                dispatch_listener(router, listener, event).await;
            });
        }
    }
}

/// Run one listener against one event: predicate, handler, and the
/// once-removal that applies whether or not the handler failed.
async fn dispatch_listener(router: Arc<Router>, listener: Arc<Listener>, event: Arc<Event>) {
    if !listener.matches(&event).await {
        return;
    }

    debug!(topic = event.topic(), handler = listener.handler_name(), "invoking listener");
    if let Err(err) = listener.handle(Arc::clone(&event)).await {
        error!(
            topic = event.topic(),
            handler = listener.handler_name(),
            error = %err,
            "listener error"
        );
    }

    if listener.once() {
        router.remove_listener(&listener).await;
    }
}

#[async_trait]
impl Lifecycle for BusService {
    fn resource(&self) -> &Resource {
        &self.resource
    }
}

#[async_trait]
impl Service for BusService {
    async fn serve(self: Arc<Self>) -> Result<(), RuntimeError> {
        let mut ingress = self
            .ingress
            .lock()
            .take()
            .ok_or_else(|| RuntimeError::message("bus ingress already consumed"))?;

        self.resource.mark_ready("dispatching");
        loop {
            tokio::select! {
                _ = self.resource.cancelled() => {
                    debug!("bus service cancelled");
                    return Ok(());
                }
                item = ingress.recv() => match item {
                    Some(event) => self.dispatch(event).await,
                    None => {
                        debug!("ingress stream closed");
                        return Ok(());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
