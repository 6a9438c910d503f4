// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Websocket link to the upstream server.
//!
//! The wire protocol is an external collaborator behind [`WsTransport`];
//! this service owns the connect/read/reconnect loop, forwards decoded
//! events into the ingress channel, and publishes
//! connected/disconnected signals that drive the state proxy resync and
//! app boot gating.

use crate::error::RuntimeError;
use crate::resource::{Lifecycle, Resource, Service};
use crate::sink::EventSink;
use async_trait::async_trait;
use hassette_core::{Event, HassetteConfig, ResourceRole, WsStatusKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Transport seam: connects to the server and yields decoded events.
#[async_trait]
pub trait WsTransport: Send + Sync {
    async fn connect(&self) -> Result<(), RuntimeError>;

    /// Next event from the wire. `Ok(None)` means the remote closed the
    /// connection cleanly.
    async fn next_event(&self) -> Result<Option<Event>, RuntimeError>;
}

pub struct WebsocketService {
    resource: Resource,
    transport: Arc<dyn WsTransport>,
    sink: EventSink,
    connected: AtomicBool,
    reconnect_pause: std::time::Duration,
}

impl WebsocketService {
    pub fn new(
        events: EventSink,
        transport: Arc<dyn WsTransport>,
        config: &HassetteConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            resource: Resource::new(
                "websocket",
                ResourceRole::Service,
                events.clone(),
                config.task_cancellation_timeout(),
            ),
            transport,
            sink: events,
            connected: AtomicBool::new(false),
            reconnect_pause: config.websocket_timeout(),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn set_connected(&self, connected: bool) {
        let was = self.connected.swap(connected, Ordering::SeqCst);
        if was == connected {
            return;
        }
        let kind = if connected { WsStatusKind::Connected } else { WsStatusKind::Disconnected };
        if connected {
            self.resource.mark_ready("connected");
        } else {
            self.resource.mark_not_ready("disconnected");
        }
        self.sink.send_best_effort(Event::websocket_status(kind)).await;
    }

    /// Pause between reconnect attempts, cut short by shutdown.
    async fn pause(&self) {
        tokio::select! {
            _ = self.resource.cancelled() => {}
            _ = tokio::time::sleep(self.reconnect_pause) => {}
        }
    }
}

#[async_trait]
impl Lifecycle for WebsocketService {
    fn resource(&self) -> &Resource {
        &self.resource
    }
}

#[async_trait]
impl Service for WebsocketService {
    async fn serve(self: Arc<Self>) -> Result<(), RuntimeError> {
        loop {
            if self.resource.shutdown_requested() {
                self.set_connected(false).await;
                return Ok(());
            }

            if let Err(error) = self.transport.connect().await {
                warn!(%error, "websocket connect failed");
                self.pause().await;
                continue;
            }

            info!("websocket connected");
            self.set_connected(true).await;

            loop {
                tokio::select! {
                    _ = self.resource.cancelled() => {
                        self.set_connected(false).await;
                        return Ok(());
                    }
                    item = self.transport.next_event() => match item {
                        Ok(Some(event)) => {
                            if self.sink.send(event).await.is_err() {
                                debug!("ingress closed, stopping websocket");
                                self.set_connected(false).await;
                                return Ok(());
                            }
                        }
                        Ok(None) => {
                            info!("websocket closed by remote");
                            break;
                        }
                        Err(error) => {
                            warn!(%error, "websocket read failed");
                            break;
                        }
                    }
                }
            }

            self.set_connected(false).await;
            self.pause().await;
        }
    }
}

#[cfg(test)]
#[path = "websocket_tests.rs"]
mod tests;
