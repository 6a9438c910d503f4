// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health endpoint for container healthchecks.
//!
//! `GET /healthz` answers 200 while the websocket is connected and 503
//! otherwise.

use crate::error::RuntimeError;
use crate::resource::{Lifecycle, Resource, Service};
use crate::sink::EventSink;
use crate::websocket::WebsocketService;
use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use hassette_core::{HassetteConfig, ResourceRole, ResourceStatus};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct HealthService {
    resource: Resource,
    websocket: Arc<WebsocketService>,
    port: u16,
    enabled: bool,
}

impl HealthService {
    pub fn new(
        events: EventSink,
        websocket: Arc<WebsocketService>,
        config: &HassetteConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            resource: Resource::new(
                "health-service",
                ResourceRole::Service,
                events,
                config.task_cancellation_timeout(),
            ),
            websocket,
            port: config.health_service_port,
            enabled: config.run_health_service,
        })
    }
}

async fn healthz(State(service): State<Arc<HealthService>>) -> impl IntoResponse {
    let ws_running = service.websocket.resource().status() == ResourceStatus::Running
        && service.websocket.is_connected();
    if ws_running {
        debug!("health check ok");
        (StatusCode::OK, Json(json!({"status": "ok", "ws": "connected"})))
    } else {
        warn!("health check failed: websocket disconnected");
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"status": "degraded", "ws": "disconnected"})))
    }
}

#[async_trait]
impl Lifecycle for HealthService {
    fn resource(&self) -> &Resource {
        &self.resource
    }
}

#[async_trait]
impl Service for HealthService {
    async fn serve(self: Arc<Self>) -> Result<(), RuntimeError> {
        if !self.enabled {
            info!("health service disabled by configuration");
            self.resource.mark_ready("disabled");
            self.resource.cancelled().await;
            return Ok(());
        }

        let router = Router::new().route("/healthz", get(healthz)).with_state(Arc::clone(&self));
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", self.port)).await?;
        info!(port = self.port, "health service listening");
        self.resource.mark_ready("listening");

        let shutdown = self.resource.shutdown_token();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| RuntimeError::message(format!("health server failed: {e}")))
    }
}
