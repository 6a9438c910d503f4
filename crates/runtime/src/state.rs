// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State proxy: the authoritative local cache of entity states.
//!
//! Writes are serialized by one async lock and mutate the map under a
//! brief blocking write lock; entries are whole `Arc`s, replaced
//! atomically, so readers never observe a partially updated state.
//! Reads are cheap shared-lock clones and never await.
//!
//! A websocket disconnect clears the cache and marks the proxy
//! not-ready; reconnect rebuilds it from the API's authoritative state
//! list. Between those moments readers get `NotReady` instead of stale
//! answers.

use crate::api::HassApi;
use crate::bus::{BusHandle, SubscribeOptions};
use crate::error::RuntimeError;
use crate::resource::{Lifecycle, Resource};
use crate::sink::EventSink;
use async_trait::async_trait;
use hassette_bus::Handler;
use hassette_core::{
    EntityState, HassetteConfig, ResourceRole, StateChangedPayload, WsStatusKind,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct StateProxy {
    resource: Resource,
    api: Arc<dyn HassApi>,
    cache: RwLock<HashMap<String, Arc<EntityState>>>,
    write_lock: Mutex<()>,
}

impl StateProxy {
    pub fn new(events: EventSink, api: Arc<dyn HassApi>, config: &HassetteConfig) -> Arc<Self> {
        Arc::new(Self {
            resource: Resource::new(
                "state-proxy",
                ResourceRole::Resource,
                events,
                config.task_cancellation_timeout(),
            ),
            api,
            cache: RwLock::new(HashMap::new()),
            write_lock: Mutex::new(()),
        })
    }

    /// Cached state for an entity, or `None` when the entity does not
    /// exist. Errors until the proxy has synchronized.
    pub fn get_state(&self, entity_id: &str) -> Result<Option<Arc<EntityState>>, RuntimeError> {
        if !self.resource.is_ready() {
            return Err(RuntimeError::NotReady(format!(
                "state proxy is not synchronized ({})",
                self.resource.ready_reason().unwrap_or_default()
            )));
        }
        Ok(self.cache.read().get(entity_id).cloned())
    }

    /// Number of cached entities.
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    /// Apply one state change. Insert on appear, remove on disappear,
    /// replace otherwise. Called by the bus ahead of listener dispatch,
    /// so per-entity updates follow event arrival order.
    pub(crate) async fn apply_state_change(&self, payload: &StateChangedPayload) {
        let _guard = self.write_lock.lock().await;
        let mut cache = self.cache.write();
        match &payload.new_state {
            Some(new_state) => {
                cache.insert(payload.entity_id.clone(), Arc::new(new_state.clone()));
            }
            None => {
                cache.remove(&payload.entity_id);
            }
        }
    }

    async fn handle_disconnect(&self) {
        let _guard = self.write_lock.lock().await;
        self.cache.write().clear();
        self.resource.mark_not_ready("upstream disconnected");
        info!("state cache cleared after disconnect");
    }

    /// Rebuild from the authoritative GET. A failed resync leaves the
    /// proxy not-ready until the next reconnect signal.
    async fn handle_reconnect(&self) {
        // hold the write lock across fetch and rebuild so a concurrent
        // state change cannot be clobbered by older GET data
        let _guard = self.write_lock.lock().await;
        let states = match self.api.get_states().await {
            Ok(states) => states,
            Err(error) => {
                warn!(%error, "state resync failed, staying not-ready");
                return;
            }
        };

        let count = states.len();
        {
            let mut cache = self.cache.write();
            cache.clear();
            for state in states {
                cache.insert(state.entity_id.clone(), Arc::new(state));
            }
        }
        self.resource.mark_ready("synchronized");
        info!(entities = count, "state cache rebuilt from upstream");
    }

    /// Wire the disconnect/reconnect subscriptions.
    pub async fn attach(self: &Arc<Self>, bus: &BusHandle) -> Result<(), RuntimeError> {
        let proxy = Arc::clone(self);
        bus.on_websocket_status(
            Some(WsStatusKind::Disconnected),
            Handler::new("state-proxy:disconnect", move |_event| {
                let proxy = Arc::clone(&proxy);
                async move {
                    proxy.handle_disconnect().await;
                    Ok::<_, std::convert::Infallible>(())
                }
            }),
            SubscribeOptions::default(),
        )
        .await?;

        let proxy = Arc::clone(self);
        bus.on_websocket_status(
            Some(WsStatusKind::Connected),
            Handler::new("state-proxy:reconnect", move |_event| {
                let proxy = Arc::clone(&proxy);
                async move {
                    proxy.handle_reconnect().await;
                    Ok::<_, std::convert::Infallible>(())
                }
            }),
            SubscribeOptions::default(),
        )
        .await?;

        debug!("state proxy subscriptions attached");
        Ok(())
    }
}

#[async_trait]
impl Lifecycle for StateProxy {
    fn resource(&self) -> &Resource {
        &self.resource
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
