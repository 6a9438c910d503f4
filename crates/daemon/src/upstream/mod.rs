// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upstream Home Assistant collaborators.
//!
//! One client implements both seams the core consumes: the REST API
//! (`get_states`, `call_service`) over reqwest and the websocket event
//! stream over tokio-tungstenite. Protocol details stay here; the core
//! only sees `Event` values.

mod events;
mod ws;

pub use events::parse_ws_message;

use async_trait::async_trait;
use hassette_core::{EntityState, Event, HassetteConfig};
use hassette_runtime::{ApiError, HassApi, RuntimeError, WsTransport};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid hass.url '{0}'")]
    Url(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("websocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("unexpected handshake message: {0}")]
    Handshake(String),
}

pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    stream: Mutex<Option<ws::HaSocket>>,
}

impl UpstreamClient {
    pub fn new(config: &HassetteConfig) -> Result<Self, UpstreamError> {
        let base_url = config.hass.url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(UpstreamError::Url(base_url));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token: config.hass.token.clone(),
            stream: Mutex::new(None),
        })
    }

    fn ws_url(&self) -> String {
        let scheme_swapped = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else {
            format!("ws://{}", self.base_url.trim_start_matches("http://"))
        };
        format!("{scheme_swapped}/api/websocket")
    }
}

#[async_trait]
impl HassApi for UpstreamClient {
    async fn get_states(&self) -> Result<Vec<EntityState>, ApiError> {
        let url = format!("{}/api/states", self.base_url);
        let states = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ApiError::Request(e.to_string()))?
            .json::<Vec<EntityState>>()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        debug!(count = states.len(), "fetched states");
        Ok(states)
    }

    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: Map<String, Value>,
    ) -> Result<(), ApiError> {
        let url = format!("{}/api/services/{domain}/{service}", self.base_url);
        self.http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&Value::Object(data))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ApiError::Request(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl WsTransport for UpstreamClient {
    async fn connect(&self) -> Result<(), RuntimeError> {
        let socket = ws::HaSocket::connect(&self.ws_url(), &self.token)
            .await
            .map_err(|e| RuntimeError::message(e.to_string()))?;
        *self.stream.lock().await = Some(socket);
        Ok(())
    }

    async fn next_event(&self) -> Result<Option<Event>, RuntimeError> {
        let mut guard = self.stream.lock().await;
        loop {
            let frame = match guard.as_mut() {
                Some(socket) => socket.next_text().await,
                None => return Err(RuntimeError::message("websocket is not connected")),
            };
            match frame {
                Ok(Some(text)) => {
                    if let Some(event) = parse_ws_message(&text) {
                        return Ok(Some(event));
                    }
                    // results, pongs and unknown frames are skipped
                }
                Ok(None) => {
                    *guard = None;
                    return Ok(None);
                }
                Err(e) => {
                    *guard = None;
                    return Err(RuntimeError::message(e.to_string()));
                }
            }
        }
    }
}
