// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared rig: a full `Hassette` wired to scripted collaborators.

use async_trait::async_trait;
use hassette_core::{Clock, EntityState, Event, HassetteConfig};
use hassette_runtime::{
    ApiError, AppRegistry, HassApi, Hassette, HassetteParams, RuntimeError, WsTransport,
};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Websocket fake: each "session" is a channel of events; dropping the
/// sender reads as a remote close, and `connect` fails until another
/// session is queued.
pub struct ScriptedTransport {
    sessions: Mutex<VecDeque<mpsc::Receiver<Event>>>,
    current: tokio::sync::Mutex<Option<mpsc::Receiver<Event>>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sessions: Mutex::new(VecDeque::new()),
            current: tokio::sync::Mutex::new(None),
        })
    }

    /// Queue a fresh session and return its feeder.
    pub fn add_session(&self) -> mpsc::Sender<Event> {
        let (tx, rx) = mpsc::channel(64);
        self.sessions.lock().unwrap().push_back(rx);
        tx
    }
}

#[async_trait]
impl WsTransport for ScriptedTransport {
    async fn connect(&self) -> Result<(), RuntimeError> {
        let next = self.sessions.lock().unwrap().pop_front();
        match next {
            Some(rx) => {
                *self.current.lock().await = Some(rx);
                Ok(())
            }
            None => Err(RuntimeError::message("no session scripted")),
        }
    }

    async fn next_event(&self) -> Result<Option<Event>, RuntimeError> {
        let mut guard = self.current.lock().await;
        match guard.as_mut() {
            Some(rx) => Ok(rx.recv().await),
            None => Ok(None),
        }
    }
}

/// REST fake with a scripted state list.
#[derive(Default)]
pub struct FakeApi {
    pub states: Mutex<Vec<EntityState>>,
}

impl FakeApi {
    pub fn with_states(states: Vec<EntityState>) -> Arc<Self> {
        Arc::new(Self { states: Mutex::new(states) })
    }
}

#[async_trait]
impl HassApi for FakeApi {
    async fn get_states(&self) -> Result<Vec<EntityState>, ApiError> {
        Ok(self.states.lock().unwrap().clone())
    }

    async fn call_service(
        &self,
        _domain: &str,
        _service: &str,
        _data: Map<String, Value>,
    ) -> Result<(), ApiError> {
        Ok(())
    }
}

pub struct Rig {
    pub hassette: Arc<Hassette>,
    pub transport: Arc<ScriptedTransport>,
    pub feed: mpsc::Sender<Event>,
    pub api: Arc<FakeApi>,
}

pub async fn rig() -> Rig {
    rig_with(HassetteConfig::default(), Vec::new(), None).await
}

pub async fn rig_with(
    mut config: HassetteConfig,
    states: Vec<EntityState>,
    clock: Option<Arc<dyn Clock>>,
) -> Rig {
    config.run_health_service = false;
    config.websocket_timeout_seconds = 0.05;
    config.startup_timeout_seconds = 5.0;
    config.scheduler_min_delay_seconds = 0.005;

    let transport = ScriptedTransport::new();
    let feed = transport.add_session();
    let api = FakeApi::with_states(states);

    let hassette = Hassette::new(HassetteParams {
        config,
        registry: AppRegistry::new(),
        transport: Arc::clone(&transport) as Arc<dyn WsTransport>,
        api: Arc::clone(&api) as Arc<dyn HassApi>,
        clock,
        config_loader: None,
    });
    hassette.start().await.expect("rig start");
    hassette.wait_until_ready().await.expect("rig readiness");

    Rig { hassette, transport, feed, api }
}

pub fn state_change(entity_id: &str, old: Option<&str>, new: Option<&str>) -> Event {
    Event::state_changed(
        entity_id,
        old.map(|s| EntityState::new(entity_id, s)),
        new.map(|s| EntityState::new(entity_id, s)),
    )
}

pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
}
