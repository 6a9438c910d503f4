// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types for the Hassette runtime.
//!
//! Events are immutable value objects: a topic string plus a tagged
//! payload. Equality is structural. Serializes with
//! `{"type": "scope:name", ...fields}` format.

use crate::entity::EntityState;
use crate::status::{ResourceRole, ResourceStatus};
use crate::topics;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// An event flowing through the bus: a topic plus a typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    topic: String,
    pub payload: Payload,
}

/// Tagged union of event payload kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Payload {
    #[serde(rename = "hass:state_changed")]
    StateChanged(StateChangedPayload),

    #[serde(rename = "hass:call_service")]
    CallService(CallServicePayload),

    #[serde(rename = "hass:component_loaded")]
    ComponentLoaded { component: String },

    #[serde(rename = "hass:service_registered")]
    ServiceRegistered { domain: String, service: String },

    #[serde(rename = "hassette:service_status")]
    ServiceStatus(ServiceStatusPayload),

    #[serde(rename = "hassette:file_watcher")]
    FileWatcher(FileWatcherPayload),

    #[serde(rename = "hassette:websocket_status")]
    WebsocketStatus { event_type: WsStatusKind },

    #[serde(rename = "hassette:app_load_completed")]
    AppLoadCompleted,

    /// Opaque user-defined payload.
    #[serde(rename = "custom")]
    Custom { name: String, data: Value },
}

/// `{entity_id, old_state, new_state}` for `hass.event.state_changed`.
///
/// `old_state == None` means the entity appeared; `new_state == None`
/// means it was removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChangedPayload {
    pub entity_id: String,
    pub old_state: Option<EntityState>,
    pub new_state: Option<EntityState>,
}

impl StateChangedPayload {
    /// Entity domain, the part of the id before the first `.`.
    pub fn domain(&self) -> &str {
        self.entity_id.split('.').next().unwrap_or(&self.entity_id)
    }

    pub fn state_value_old(&self) -> Option<&Value> {
        self.old_state.as_ref().map(|s| &s.state)
    }

    pub fn state_value_new(&self) -> Option<&Value> {
        self.new_state.as_ref().map(|s| &s.state)
    }

    pub fn attr_old(&self, name: &str) -> Option<&Value> {
        self.old_state.as_ref().and_then(|s| s.attribute(name))
    }

    pub fn attr_new(&self, name: &str) -> Option<&Value> {
        self.new_state.as_ref().and_then(|s| s.attribute(name))
    }
}

/// `{domain, service, service_data}` for `hass.event.call_service`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallServicePayload {
    pub domain: String,
    pub service: String,
    #[serde(default)]
    pub service_data: Map<String, Value>,
}

/// Resource lifecycle transition for `hassette.event.service_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatusPayload {
    pub resource_name: String,
    pub role: ResourceRole,
    pub status: ResourceStatus,
    pub previous_status: ResourceStatus,
    /// Rendered error for FAILED/CRASHED transitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// File change notification for `hassette.event.file_watcher`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileWatcherPayload {
    pub event_type: FileChangeKind,
    pub changed_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileChangeKind {
    Created,
    Modified,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WsStatusKind {
    Connected,
    Disconnected,
}

impl Event {
    /// Build an event with an explicit topic. Prefer the typed
    /// constructors below for the canonical wire vocabulary.
    pub fn new(topic: impl Into<String>, payload: Payload) -> Self {
        Self { topic: topic.into(), payload }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn state_changed(
        entity_id: impl Into<String>,
        old_state: Option<EntityState>,
        new_state: Option<EntityState>,
    ) -> Self {
        Self::new(
            topics::HASS_EVENT_STATE_CHANGED,
            Payload::StateChanged(StateChangedPayload {
                entity_id: entity_id.into(),
                old_state,
                new_state,
            }),
        )
    }

    pub fn call_service(
        domain: impl Into<String>,
        service: impl Into<String>,
        service_data: Map<String, Value>,
    ) -> Self {
        Self::new(
            topics::HASS_EVENT_CALL_SERVICE,
            Payload::CallService(CallServicePayload {
                domain: domain.into(),
                service: service.into(),
                service_data,
            }),
        )
    }

    pub fn component_loaded(component: impl Into<String>) -> Self {
        Self::new(
            topics::HASS_EVENT_COMPONENT_LOADED,
            Payload::ComponentLoaded { component: component.into() },
        )
    }

    pub fn service_registered(domain: impl Into<String>, service: impl Into<String>) -> Self {
        Self::new(
            topics::HASS_EVENT_SERVICE_REGISTERED,
            Payload::ServiceRegistered { domain: domain.into(), service: service.into() },
        )
    }

    pub fn service_status(payload: ServiceStatusPayload) -> Self {
        Self::new(topics::HASSETTE_EVENT_SERVICE_STATUS, Payload::ServiceStatus(payload))
    }

    pub fn file_watcher(event_type: FileChangeKind, changed_paths: Vec<PathBuf>) -> Self {
        Self::new(
            topics::HASSETTE_EVENT_FILE_WATCHER,
            Payload::FileWatcher(FileWatcherPayload { event_type, changed_paths }),
        )
    }

    pub fn websocket_status(event_type: WsStatusKind) -> Self {
        Self::new(topics::HASSETTE_EVENT_WEBSOCKET_STATUS, Payload::WebsocketStatus { event_type })
    }

    pub fn app_load_completed() -> Self {
        Self::new(topics::HASSETTE_EVENT_APP_LOAD_COMPLETED, Payload::AppLoadCompleted)
    }

    pub fn custom(topic: impl Into<String>, name: impl Into<String>, data: Value) -> Self {
        Self::new(topic, Payload::Custom { name: name.into(), data })
    }

    /// State-change payload, if that is what this event carries.
    pub fn as_state_changed(&self) -> Option<&StateChangedPayload> {
        match &self.payload {
            Payload::StateChanged(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_call_service(&self) -> Option<&CallServicePayload> {
        match &self.payload {
            Payload::CallService(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_service_status(&self) -> Option<&ServiceStatusPayload> {
        match &self.payload {
            Payload::ServiceStatus(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_file_watcher(&self) -> Option<&FileWatcherPayload> {
        match &self.payload {
            Payload::FileWatcher(p) => Some(p),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
