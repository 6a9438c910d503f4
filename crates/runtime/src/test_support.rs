// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fakes for runtime tests.

use crate::api::{ApiError, HassApi};
use crate::error::RuntimeError;
use crate::websocket::WsTransport;
use async_trait::async_trait;
use hassette_core::{EntityState, Event};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// API fake: scripted `get_states`, recorded `call_service`.
#[derive(Default)]
pub struct FakeApi {
    pub states: Mutex<Vec<EntityState>>,
    pub fail_get_states: AtomicBool,
    pub service_calls: Mutex<Vec<(String, String)>>,
}

impl FakeApi {
    pub fn with_states(states: Vec<EntityState>) -> Arc<Self> {
        Arc::new(Self { states: Mutex::new(states), ..Self::default() })
    }
}

#[async_trait]
impl HassApi for FakeApi {
    async fn get_states(&self) -> Result<Vec<EntityState>, ApiError> {
        if self.fail_get_states.load(Ordering::SeqCst) {
            return Err(ApiError::NotConnected);
        }
        Ok(self.states.lock().clone())
    }

    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        _data: Map<String, Value>,
    ) -> Result<(), ApiError> {
        self.service_calls.lock().push((domain.to_string(), service.to_string()));
        Ok(())
    }
}

/// Transport fake: events are fed through a channel; `None` from the
/// channel reads as a clean remote close.
pub struct ScriptedTransport {
    rx: tokio::sync::Mutex<mpsc::Receiver<Event>>,
    pub fail_connect: AtomicBool,
}

impl ScriptedTransport {
    pub fn new() -> (Arc<Self>, mpsc::Sender<Event>) {
        let (tx, rx) = mpsc::channel(64);
        (
            Arc::new(Self { rx: tokio::sync::Mutex::new(rx), fail_connect: AtomicBool::new(false) }),
            tx,
        )
    }
}

#[async_trait]
impl WsTransport for ScriptedTransport {
    async fn connect(&self) -> Result<(), RuntimeError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(RuntimeError::message("connection refused"));
        }
        Ok(())
    }

    async fn next_event(&self) -> Result<Option<Event>, RuntimeError> {
        Ok(self.rx.lock().await.recv().await)
    }
}
