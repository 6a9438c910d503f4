// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! REST API collaborator seam.
//!
//! The upstream protocol is not this crate's concern; the runtime only
//! consumes `get_states` (state proxy resync) and `call_service`
//! (apps). Production wires an HTTP client, tests wire fakes.

use crate::error::RuntimeError;
use crate::state::StateProxy;
use async_trait::async_trait;
use hassette_core::EntityState;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("upstream request failed: {0}")]
    Request(String),

    #[error("not connected to the upstream server")]
    NotConnected,
}

/// What the runtime consumes from the Home Assistant REST API.
#[async_trait]
pub trait HassApi: Send + Sync {
    /// Authoritative list of all entity states.
    async fn get_states(&self) -> Result<Vec<EntityState>, ApiError>;

    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: Map<String, Value>,
    ) -> Result<(), ApiError>;
}

/// Facade handed to apps: cached reads through the state proxy,
/// writes through the API collaborator.
#[derive(Clone)]
pub struct Api {
    api: Arc<dyn HassApi>,
    state: Arc<StateProxy>,
}

impl Api {
    pub fn new(api: Arc<dyn HassApi>, state: Arc<StateProxy>) -> Self {
        Self { api, state }
    }

    /// Cached state of an entity. Errors with `NotReady` until the
    /// proxy has synchronized with the upstream server.
    pub fn get_state(&self, entity_id: &str) -> Result<Option<Arc<EntityState>>, RuntimeError> {
        self.state.get_state(entity_id)
    }

    pub async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: Map<String, Value>,
    ) -> Result<(), RuntimeError> {
        self.api.call_service(domain, service, data).await.map_err(RuntimeError::from)
    }

    /// Bypass the cache and ask the upstream server directly.
    pub async fn get_states_uncached(&self) -> Result<Vec<EntityState>, RuntimeError> {
        self.api.get_states().await.map_err(RuntimeError::from)
    }
}
